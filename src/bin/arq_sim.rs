//! ARQ 单次传输仿真
//!
//! 在不可靠链路上用 Stop-and-Wait / Go-Back-N / Selective-Repeat 传输一条消息，打印统计。

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use arq_sim::arq::Protocol;
use arq_sim::net::FaultConfig;
use arq_sim::sim::{
    DEFAULT_CHUNK_SIZE, DEFAULT_MAX_ITERATIONS, DEFAULT_TICK_US, DEFAULT_TIMEOUT_US,
    DEFAULT_WINDOW_SIZE, SimConfig, Simulation, WallClock,
};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "arq_sim", about = "ARQ 仿真：在有损链路上可靠传输一条消息")]
struct Args {
    /// 要传输的消息
    #[arg(long, default_value = "HelloWorld")]
    message: String,
    /// 从 JSON 读取配置（命令行中的协议/窗口等参数将被忽略）
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = Protocol::GoBackN)]
    protocol: Protocol,
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,
    #[arg(long, default_value_t = DEFAULT_WINDOW_SIZE)]
    window: usize,
    /// 超时（微秒）
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_US)]
    timeout_us: u64,
    /// 手动时钟每轮前进（微秒）
    #[arg(long, default_value_t = DEFAULT_TICK_US)]
    tick_us: u64,
    #[arg(long, default_value_t = 0.2)]
    packet_loss: f64,
    #[arg(long, default_value_t = 0.1)]
    corruption: f64,
    #[arg(long, default_value_t = 0.1)]
    ack_loss: f64,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    max_iterations: u64,
    /// 按真实时间运行（每轮休眠 tick_us）
    #[arg(long)]
    realtime: bool,
    /// 以 JSON 输出统计
    #[arg(long)]
    json: bool,
    /// 把逐事件轨迹写到该文件
    #[arg(long)]
    trace_json: Option<PathBuf>,
}

impl Args {
    fn sim_config(&self) -> SimConfig {
        SimConfig {
            protocol: self.protocol,
            chunk_size: self.chunk_size,
            window_size: self.window,
            timeout_us: self.timeout_us,
            tick_us: self.tick_us,
            faults: FaultConfig::new(self.packet_loss, self.corruption, self.ack_loss),
            seed: self.seed,
            max_iterations: self.max_iterations,
            ..SimConfig::default()
        }
    }
}

fn main() -> ExitCode {
    // 初始化 tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let cfg = match &args.config {
        Some(path) => match fs::read_to_string(path) {
            Ok(raw) => SimConfig::from_json_str(&raw),
            Err(e) => {
                eprintln!("cannot read {}: {e}", path.display());
                return ExitCode::from(2);
            }
        },
        None => {
            let cfg = args.sim_config();
            cfg.validate().map(|_| cfg)
        }
    };
    let cfg = match cfg {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            return ExitCode::from(2);
        }
    };

    let mut sim = match Simulation::new(args.message.as_bytes(), &cfg) {
        Ok(sim) => sim,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            return ExitCode::from(2);
        }
    };
    if args.realtime {
        sim = sim.with_clock(Box::new(WallClock::new(Duration::from_micros(cfg.tick_us))));
    }
    if args.trace_json.is_some() {
        sim = sim.with_trace();
    }

    let report = sim.run_to_completion();

    if args.json {
        let json = serde_json::to_string(&report).expect("serialize report");
        println!("{json}");
    } else {
        println!("{}", report.stats);
        println!(
            "success={} received={:?}",
            report.success,
            String::from_utf8_lossy(&sim.reassembled())
        );
    }

    if let Some(path) = args.trace_json {
        if let Some(log) = sim.take_trace() {
            let json = log.to_json().expect("serialize trace events");
            fs::write(&path, json).expect("write trace json");
            eprintln!("wrote trace events to {}", path.display());
        }
    }

    if report.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
