// ==========================================
// 烘焙生产计划系统 - 命令行入口
// ==========================================
// 用法: bakery-planner <command> [json-args]
// 成功: 结果 JSON 输出到 stdout
// 失败: 错误 JSON 输出到 stderr, 退出码 1
// ==========================================

use std::process::ExitCode;

use bakery_planner::app::{dispatch, get_default_db_path, AppState, COMMANDS};
use bakery_planner::logging;

fn print_usage() {
    eprintln!("{} {}", bakery_planner::APP_NAME, bakery_planner::VERSION);
    eprintln!("用法: bakery-planner <command> [json-args]");
    eprintln!("可用命令: {}", COMMANDS.join(", "));
}

fn main() -> ExitCode {
    // 初始化日志系统
    logging::init();

    let mut args = std::env::args().skip(1);
    let Some(command) = args.next() else {
        print_usage();
        return ExitCode::from(2);
    };
    let args_json = args.next().unwrap_or_default();

    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    let state = match AppState::new(db_path) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("AppState初始化失败: {}", e);
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match dispatch(&state, &command, &args_json) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}
