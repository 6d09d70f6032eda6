//! 切片全部受试者, 并生成训练/测试划分.

mod runner;

fn main() {
    utils::init_logger();
    match runner::run() {
        Ok(result) => result.describe(),
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    }
}
