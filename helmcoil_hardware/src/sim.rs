//! Simulated bench: a bipolar source driving a coil and a gaussmeter reading it.
//!
//! Both handles share one `BenchState`, so a setpoint written to the source is
//! what the gaussmeter sees. Replies use the same fixed formats as the real
//! instruments, terminator included.

use std::cell::RefCell;
use std::rc::Rc;

use helmcoil_traits::Instrument;

use crate::error::HwError;

pub const SOURCE_IDN: &str = "IDN PBX 40-10 VER1.13     KIKUSUI    ";
pub const GAUSSMETER_IDN: &str = "LSCI,MODEL421,0,010306";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone)]
struct BenchState {
    iset_a: f64,
    vset_v: f64,
    fine: i8,
    output: bool,
    stuck_output: bool,
    // Steady-state error of the source at fine = 0 (mA)
    offset_ma: f64,
    // Output current change per fine unit (mA)
    ma_per_fine: f64,
    load_ohms: f64,
    gauss_per_amp: f64,
    range: u8,
    source_writes: Vec<String>,
    sensor_writes: Vec<String>,
}

impl BenchState {
    fn measured_current_a(&self) -> f64 {
        if !self.output {
            return 0.0;
        }
        self.iset_a + (self.offset_ma + self.ma_per_fine * f64::from(self.fine)) / 1000.0
    }
}

/// Shared handle to the simulated coil model.
#[derive(Debug, Clone)]
pub struct SimulatedBench {
    state: Rc<RefCell<BenchState>>,
}

impl Default for SimulatedBench {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBench {
    /// Ideal source (no offset), output disabled, setpoint 0.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(BenchState {
                iset_a: 0.0,
                vset_v: 40.0,
                fine: 0,
                output: false,
                stuck_output: false,
                offset_ma: 0.0,
                ma_per_fine: 0.1,
                load_ohms: 2.0,
                gauss_per_amp: 20.96,
                range: 0,
                source_writes: Vec::new(),
                sensor_writes: Vec::new(),
            })),
        }
    }

    /// Steady-state output error at fine = 0, in mA.
    pub fn with_offset_ma(self, offset_ma: f64) -> Self {
        self.state.borrow_mut().offset_ma = offset_ma;
        self
    }

    /// Output current change per fine unit, in mA.
    pub fn with_fine_gain(self, ma_per_fine: f64) -> Self {
        self.state.borrow_mut().ma_per_fine = ma_per_fine;
        self
    }

    /// Ignore `OUT n` writes, as a source with a tripped interlock would.
    pub fn with_stuck_output(self, stuck: bool) -> Self {
        self.state.borrow_mut().stuck_output = stuck;
        self
    }

    pub fn with_output_enabled(self, enabled: bool) -> Self {
        self.state.borrow_mut().output = enabled;
        self
    }

    pub fn with_setpoint_ma(self, ma: i32) -> Self {
        self.state.borrow_mut().iset_a = f64::from(ma) / 1000.0;
        self
    }

    pub fn source(&self) -> SimulatedSource {
        SimulatedSource {
            state: Rc::clone(&self.state),
        }
    }

    pub fn gaussmeter(&self) -> SimulatedGaussmeter {
        SimulatedGaussmeter {
            state: Rc::clone(&self.state),
        }
    }

    pub fn output_enabled(&self) -> bool {
        self.state.borrow().output
    }

    pub fn setpoint_a(&self) -> f64 {
        self.state.borrow().iset_a
    }

    pub fn fine(&self) -> i8 {
        self.state.borrow().fine
    }

    pub fn measured_current_a(&self) -> f64 {
        self.state.borrow().measured_current_a()
    }

    pub fn sensor_range(&self) -> u8 {
        self.state.borrow().range
    }

    /// Every command written to the source, oldest first.
    pub fn source_writes(&self) -> Vec<String> {
        self.state.borrow().source_writes.clone()
    }

    pub fn sensor_writes(&self) -> Vec<String> {
        self.state.borrow().sensor_writes.clone()
    }

    /// Number of commands written to either instrument.
    pub fn write_count(&self) -> usize {
        let s = self.state.borrow();
        s.source_writes.len() + s.sensor_writes.len()
    }

    /// Setpoints commanded through `ISET`, in mA, oldest first.
    pub fn setpoint_history_ma(&self) -> Vec<i32> {
        self.state
            .borrow()
            .source_writes
            .iter()
            .filter_map(|w| w.strip_prefix("ISET "))
            .filter_map(|v| v.trim().parse::<f64>().ok())
            .map(|a| (a * 1000.0).round() as i32)
            .collect()
    }

    /// Forget recorded writes (device state is kept).
    pub fn clear_log(&self) {
        let mut s = self.state.borrow_mut();
        s.source_writes.clear();
        s.sensor_writes.clear();
    }
}

fn parse_arg<T: std::str::FromStr>(command: &str, arg: &str) -> Result<T, BoxError> {
    arg.trim()
        .parse::<T>()
        .map_err(|_| Box::new(HwError::Protocol(command.to_string())) as BoxError)
}

/// Simulated bipolar current source (PBX-style command set).
#[derive(Debug)]
pub struct SimulatedSource {
    state: Rc<RefCell<BenchState>>,
}

impl Instrument for SimulatedSource {
    fn query(&mut self, command: &str) -> Result<String, BoxError> {
        let s = self.state.borrow();
        let reply = match command.trim() {
            "IOUT?" => format!("IOUT {:6.3}A\r\n", s.measured_current_a()),
            "VOUT?" => format!("VOUT {:6.3}V\r\n", s.measured_current_a() * s.load_ohms),
            "ISET?" => format!("ISET {:6.3}A\r\n", s.iset_a),
            "VSET?" => format!("VSET {:6.3}V\r\n", s.vset_v),
            "IFINE?" => format!("IFINE {}\r\n", s.fine),
            "OUT?" => format!("OUT {:03}\r\n", u8::from(s.output)),
            "IDN?" => format!("{SOURCE_IDN}\r\n"),
            other => return Err(Box::new(HwError::Protocol(other.to_string()))),
        };
        tracing::trace!(command, reply = reply.trim_end(), "sim source query");
        Ok(reply)
    }

    fn write(&mut self, command: &str) -> Result<(), BoxError> {
        let mut s = self.state.borrow_mut();
        let trimmed = command.trim();
        let (head, arg) = trimmed.split_once(' ').unwrap_or((trimmed, ""));
        match head {
            "ISET" => s.iset_a = parse_arg::<f64>(trimmed, arg)?,
            "VSET" => s.vset_v = parse_arg::<f64>(trimmed, arg)?,
            "IFINE" => {
                let v: i32 = parse_arg(trimmed, arg)?;
                s.fine = v.clamp(i32::from(i8::MIN), i32::from(i8::MAX)) as i8;
            }
            "OUT" => {
                let v: u8 = parse_arg(trimmed, arg)?;
                if !s.stuck_output {
                    s.output = v != 0;
                }
            }
            _ => return Err(Box::new(HwError::Protocol(trimmed.to_string()))),
        }
        s.source_writes.push(trimmed.to_string());
        Ok(())
    }
}

/// Simulated gaussmeter (Model 421-style command set).
#[derive(Debug)]
pub struct SimulatedGaussmeter {
    state: Rc<RefCell<BenchState>>,
}

impl Instrument for SimulatedGaussmeter {
    fn query(&mut self, command: &str) -> Result<String, BoxError> {
        let s = self.state.borrow();
        let reply = match command.trim() {
            "FIELD?" => format!("{:.2}\r\n", s.measured_current_a() * s.gauss_per_amp),
            "FIELDM?" => "\r\n".to_string(),
            "UNIT?" => "G\r\n".to_string(),
            "RANGE?" => format!("{}\r\n", s.range),
            "*IDN?" => format!("{GAUSSMETER_IDN}\r\n"),
            other => return Err(Box::new(HwError::Protocol(other.to_string()))),
        };
        Ok(reply)
    }

    fn write(&mut self, command: &str) -> Result<(), BoxError> {
        let mut s = self.state.borrow_mut();
        let trimmed = command.trim();
        match trimmed.split_once(' ') {
            Some(("RANGE", arg)) => {
                let r: u8 = parse_arg(trimmed, arg)?;
                // Model 421 has four ranges
                if r <= 3 {
                    s.range = r;
                }
            }
            _ => return Err(Box::new(HwError::Protocol(trimmed.to_string()))),
        }
        s.sensor_writes.push(trimmed.to_string());
        Ok(())
    }
}
