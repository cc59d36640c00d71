use std::io::Cursor;

use helmcoil_hardware::LineInstrument;
use helmcoil_hardware::error::HwError;
use helmcoil_traits::Instrument;

#[test]
fn query_returns_reply_unmodified() {
    let replies = Cursor::new(b"IOUT  0.012A\r\nOUT 001\r\n".to_vec());
    let mut sent = Vec::new();
    {
        let mut inst = LineInstrument::new(replies, &mut sent);
        assert_eq!(inst.query("IOUT?").unwrap(), "IOUT  0.012A\r\n");
        assert_eq!(inst.query("OUT?").unwrap(), "OUT 001\r\n");
    }
    assert_eq!(String::from_utf8(sent).unwrap(), "IOUT?\nOUT?\n");
}

#[test]
fn write_appends_configured_terminator() {
    let mut sent = Vec::new();
    {
        let mut inst =
            LineInstrument::new(Cursor::new(Vec::new()), &mut sent).with_terminator("\r\n");
        inst.write("ISET 1.250").unwrap();
    }
    assert_eq!(sent, b"ISET 1.250\r\n");
}

#[test]
fn closed_stream_reports_disconnect() {
    let mut inst = LineInstrument::new(Cursor::new(Vec::new()), Vec::new());
    let err = inst.query("FIELD?").expect_err("no reply available");
    let hw = err.downcast_ref::<HwError>().expect("typed hardware error");
    assert!(matches!(hw, HwError::Disconnected));
}
