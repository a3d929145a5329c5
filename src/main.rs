// ==========================================
// 考场编排系统 - 命令行入口
// ==========================================
// 用法:
//   exam-seating generate <date> <time> [policy] [arrangement_type] [seed]
//   exam-seating validate <date> <time>
//   exam-seating stats <date> <time>
//   exam-seating assign <date> <time> [strategy]
//   exam-seating unassign <assignment_id>
//   exam-seating duty <date>
//   exam-seating label <room_id> <row> <col> <cols> [scheme]
//   exam-seating config
// 数据库: EXAM_SEATING_DB_PATH 或用户数据目录
// ==========================================

use exam_seating::app::{get_default_db_path, AppState};
use exam_seating::GenerateRequest;
use serde::Serialize;

const USAGE: &str = "用法: exam-seating <generate|validate|stats|assign|unassign|duty|label|config> [参数...]";

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// 读取第 idx 个位置参数（必填）
fn required<'a>(args: &'a [String], idx: usize, name: &str) -> Result<&'a str, String> {
    args.get(idx)
        .map(|s| s.as_str())
        .ok_or_else(|| format!("缺少参数 <{}>\n{}", name, USAGE))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    exam_seating::logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = required(&args, 0, "command")?;

    let db_path = get_default_db_path();
    tracing::info!("{} v{}，数据库: {}", exam_seating::APP_NAME, exam_seating::VERSION, db_path);
    let state = AppState::new(db_path)?;

    match command {
        "generate" => {
            let mut request = GenerateRequest::new(required(&args, 1, "date")?, required(&args, 2, "time")?);
            request.conflict_policy = args.get(3).cloned();
            request.arrangement_type = args.get(4).cloned();
            request.seed = match args.get(5) {
                Some(s) => Some(s.parse::<u64>().map_err(|_| format!("seed 不是整数: {}", s))?),
                None => None,
            };
            print_json(&state.seating_api.generate(&request)?)?;
        }
        "validate" => {
            let conflicts = state
                .seating_api
                .validate(required(&args, 1, "date")?, required(&args, 2, "time")?)?;
            print_json(&conflicts)?;
        }
        "stats" => {
            let stats = state
                .seating_api
                .statistics(required(&args, 1, "date")?, required(&args, 2, "time")?)?;
            print_json(&stats)?;
        }
        "assign" => {
            let summary = state.invigilator_api.assign_invigilators(
                required(&args, 1, "date")?,
                required(&args, 2, "time")?,
                args.get(3).map(|s| s.as_str()),
            )?;
            print_json(&summary)?;
        }
        "unassign" => {
            let raw = required(&args, 1, "assignment_id")?;
            let id = raw
                .parse::<i64>()
                .map_err(|_| format!("assignment_id 不是整数: {}", raw))?;
            let changed = state.invigilator_api.unassign(id)?;
            println!("changed={}", changed);
        }
        "duty" => {
            print_json(&state.invigilator_api.duty_chart(required(&args, 1, "date")?)?)?;
        }
        "label" => {
            let room_id = required(&args, 1, "room_id")?;
            let mut nums = [0u32; 3];
            for (i, name) in ["row", "col", "cols"].iter().enumerate() {
                let raw = required(&args, i + 2, name)?;
                nums[i] = raw.parse::<u32>().map_err(|_| format!("{} 不是整数: {}", name, raw))?;
            }
            let label = state.seating_api.format_seat_label(
                room_id,
                nums[0],
                nums[1],
                args.get(5).map(|s| s.as_str()),
                nums[2],
            )?;
            println!("{}", label);
        }
        "config" => {
            let snapshot = state.config_manager.get_config_snapshot()?;
            println!("{}", snapshot);
        }
        other => {
            return Err(format!("未知命令: {}\n{}", other, USAGE).into());
        }
    }

    Ok(())
}
