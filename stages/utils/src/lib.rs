//! 各阶段程序依赖的通用组件.

use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::io;

pub mod loader;

const SEP: &str = "--------------------------------------------------------";

/// 简单分隔线.
#[inline]
pub fn sep() {
    println!("{SEP}");
}

/// 简单分隔线.
#[inline]
pub fn sep_to<W: io::Write>(mut w: W) -> io::Result<()> {
    writeln!(&mut w, "{SEP}")
}

/// 初始化日志. 默认级别为 `Info`, 可由 `$RUST_LOG` 覆盖.
pub fn init_logger() {
    if let Err(e) = SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .init()
    {
        eprintln!("Logger already initialised: {e}");
    }
}
