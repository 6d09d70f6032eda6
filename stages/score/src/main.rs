//! 由已写出的预测结果重新计算测试集指标, 并重组 3D 结果.

mod runner;

fn main() {
    utils::init_logger();
    match runner::run() {
        Ok(report) => {
            utils::sep();
            println!("{report}");
            utils::sep();
        }
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    }
}
