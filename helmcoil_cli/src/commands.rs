//! Backend assembly and subcommand execution.

use std::io::BufReader;
use std::net::TcpStream;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Local;
use eyre::WrapErr;
use helmcoil_config::{Backend, Config};
use helmcoil_core::hw_error::map_hw_error;
use helmcoil_core::sink::TIMESTAMP_FORMAT;
use helmcoil_core::{
    Controller, ControllerBuilder, CsvLogSink, LogSink, Missing, RampOutcome, StatusSample, SweepPlan,
};
use helmcoil_hardware::{LineInstrument, SimulatedBench};
use helmcoil_traits::{Clock, Instrument, ManualClock, MonotonicClock};
use serde_json::json;

use crate::cli::Commands;
use crate::startup;

/// Sim knobs can be overridden from the environment (handy in tests).
const ENV_SIM_OFFSET: &str = "HELMCOIL_SIM_OFFSET_MA";
const ENV_SIM_STUCK: &str = "HELMCOIL_SIM_STUCK_OUTPUT";

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.trim(), "1" | "true" | "yes" | "on"))
}

fn builder_from(cfg: &Config, abort: Arc<AtomicBool>) -> ControllerBuilder<Missing, Missing> {
    Controller::builder()
        .with_ramp((&cfg.ramp).into())
        .with_output((&cfg.output).into())
        .with_fine((&cfg.fine).into())
        .with_sweep((&cfg.sweep).into())
        .with_field((&cfg.field).into())
        .with_sensor_cfg((&cfg.sensor).into())
        .with_abort_check(move || abort.load(Ordering::SeqCst))
}

fn simulated_bench(cfg: &Config) -> eyre::Result<SimulatedBench> {
    let sim = &cfg.instruments.sim;
    let offset_ma = match std::env::var(ENV_SIM_OFFSET) {
        Ok(raw) => raw
            .trim()
            .parse::<f64>()
            .wrap_err_with(|| format!("{ENV_SIM_OFFSET} must be a number, got {raw:?}"))?,
        Err(_) => sim.offset_ma,
    };
    let stuck = env_flag(ENV_SIM_STUCK).unwrap_or(sim.stuck_output);
    tracing::info!(offset_ma, ma_per_fine = sim.ma_per_fine, stuck, "using simulated bench");
    Ok(SimulatedBench::new()
        .with_offset_ma(offset_ma)
        .with_fine_gain(sim.ma_per_fine)
        .with_stuck_output(stuck))
}

type TcpInstrument = LineInstrument<BufReader<TcpStream>, TcpStream>;

fn connect(addr: Option<&str>, cfg: &Config, what: &str) -> eyre::Result<TcpInstrument> {
    let addr = addr.ok_or_else(|| eyre::eyre!("instruments.{what}_addr is not set"))?;
    let timeout = Duration::from_millis(cfg.instruments.timeout_ms);
    let inst = LineInstrument::connect_tcp(addr, timeout)
        .map_err(|e| eyre::Report::new(map_hw_error(&e)))
        .wrap_err_with(|| format!("connect {what} at {addr}"))?;
    Ok(inst
        .with_terminator(cfg.instruments.terminator.as_str())
        .named(what))
}

/// Assemble the configured backend and run `cmd` against it.
pub fn run(cmd: &Commands, cfg: &Config, json: bool, abort: Arc<AtomicBool>) -> eyre::Result<()> {
    let builder = builder_from(cfg, abort);
    match cfg.instruments.backend {
        Backend::Sim => {
            let bench = simulated_bench(cfg)?;
            let clock: Arc<dyn Clock + Send + Sync> = if cfg.instruments.sim.realtime {
                Arc::new(MonotonicClock::new())
            } else {
                Arc::new(ManualClock::new())
            };
            let mut ctl = builder
                .with_source(bench.source())
                .with_sensor(bench.gaussmeter())
                .with_clock(clock)
                .build()?;
            execute(&mut ctl, cmd, cfg, json)
        }
        Backend::Tcp => {
            let source = connect(cfg.instruments.source_addr.as_deref(), cfg, "source")?;
            let sensor = connect(cfg.instruments.sensor_addr.as_deref(), cfg, "sensor")?;
            let mut ctl = builder.with_source(source).with_sensor(sensor).build()?;
            execute(&mut ctl, cmd, cfg, json)
        }
    }
}

fn execute<P: Instrument, G: Instrument>(
    ctl: &mut Controller<P, G>,
    cmd: &Commands,
    cfg: &Config,
    json: bool,
) -> eyre::Result<()> {
    match cmd {
        Commands::Status { save } => {
            let sample = ctl.read_status()?;
            if let Some(path) = save {
                let mut sink = CsvLogSink::create(path)?;
                sink.begin(sample.taken_at, "status")?;
                sink.record(&sample)?;
                sink.finish(Local::now())?;
            }
            if json {
                println!("{}", sample_json(&sample));
            } else {
                println!("{sample}");
            }
        }
        Commands::Ramp { ma, step, fine } => {
            let outcome = ctl.ramp_to(*ma, *step, *fine)?;
            report_ramp("ramp", &outcome, json);
        }
        Commands::Field { oe } => {
            let outcome = ctl.set_field(*oe)?;
            report_ramp("field", &outcome, json);
        }
        Commands::Output { state } => {
            let reported = ctl.set_output(state.is_on())?;
            if json {
                println!("{}", json!({ "command": "output", "output": reported.is_enabled() }));
            } else {
                println!("output {reported}");
            }
        }
        Commands::Sweep {
            checkpoints_csv,
            memo,
            out,
            fine,
        } => {
            let plan = match checkpoints_csv {
                Some(path) => SweepPlan::current(
                    helmcoil_config::load_checkpoints_csv(path)?,
                    cfg.sweep.mesh_ma,
                    cfg.sweep.step_ma,
                ),
                None => SweepPlan::from(&cfg.sweep),
            };
            run_plan(ctl, &plan, *fine || cfg.sweep.fine, memo, out.as_ref(), json)?;
        }
        Commands::FieldSweep { memo, out } => {
            let plan = SweepPlan::from(&cfg.field);
            run_plan(ctl, &plan, false, memo, out.as_ref(), json)?;
        }
        Commands::Init => {
            let state = startup::bring_up(ctl, cfg)?;
            if json {
                println!("{}", json!({ "command": "init", "output": state.is_enabled() }));
            } else {
                println!("bench ready, output {state}");
            }
        }
        Commands::Shutdown => {
            startup::shut_down(ctl)?;
            if json {
                println!("{}", json!({ "command": "shutdown", "output": false }));
            } else {
                println!("bench shut down");
            }
        }
        Commands::SelfCheck => {
            if cfg.startup.verify_identity {
                startup::verify_identity(ctl, &cfg.instruments)?;
            }
            let sample = ctl.read_status()?;
            tracing::info!(%sample, "self-check");
            println!("OK");
        }
    }
    Ok(())
}

fn run_plan<P: Instrument, G: Instrument>(
    ctl: &mut Controller<P, G>,
    plan: &SweepPlan,
    fine: bool,
    memo: &str,
    out: Option<&PathBuf>,
    json: bool,
) -> eyre::Result<()> {
    let path = out
        .cloned()
        .unwrap_or_else(|| PathBuf::from(format!("{}.csv", Local::now().format(TIMESTAMP_FORMAT))));
    let mut sink = CsvLogSink::create(&path)?;
    let samples = ctl
        .run_sweep(plan, fine, &mut sink, memo)
        .wrap_err_with(|| format!("sweep logging to {}", path.display()))?;
    if json {
        println!(
            "{}",
            json!({
                "command": "sweep",
                "axis": format!("{:?}", plan.axis).to_lowercase(),
                "samples": samples.len(),
                "out": path.display().to_string(),
            })
        );
    } else {
        println!("sweep complete: {} samples -> {}", samples.len(), path.display());
    }
    Ok(())
}

fn report_ramp(command: &str, o: &RampOutcome, json: bool) {
    if json {
        println!(
            "{}",
            json!({
                "command": command,
                "target_ma": o.target_ma,
                "origin_ma": o.origin_ma,
                "commands": o.commands,
                "residual_ma": o.residual_ma,
                "fine": o.fine.as_ref().map(|f| f.fine),
                "warning": o.warning.map(|w| w.to_string()),
            })
        );
        return;
    }
    if o.is_noop() {
        println!("already at {} mA", o.target_ma);
    } else {
        println!(
            "{command} complete: {} mA -> {} mA in {} writes",
            o.origin_ma, o.target_ma, o.commands
        );
    }
    if let Some(w) = &o.warning {
        println!("warning: {w}");
    }
}

fn sample_json(s: &StatusSample) -> serde_json::Value {
    json!({
        "command": "status",
        "taken_at": s.taken_at.format(TIMESTAMP_FORMAT).to_string(),
        "elapsed_s": s.elapsed_s,
        "set_current_a": s.set_current_a,
        "measured_current_a": s.measured_current_a,
        "field": s.measured_field,
        "measured_voltage_v": s.measured_voltage_v,
        "fine": s.fine,
    })
}
