// ==========================================
// 考场编排系统 - 座位号生成
// ==========================================
// 纯函数: (room_id, row, col, scheme, cols) -> 座位号
// 坐标 1 起始；同一考场同一方案下座位号互不重复
// ==========================================

use crate::engine::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 座位号方案
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatLabelScheme {
    /// (row-1)*cols + col
    Sequential,
    /// R{row}C{col}
    RowCol,
    /// 行字母 + 列号，如 A1、AA1
    AlphaNumeric,
    /// {room_id}-{seq:03}
    RoomPrefix,
}

impl SeatLabelScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatLabelScheme::Sequential => "sequential",
            SeatLabelScheme::RowCol => "row_col",
            SeatLabelScheme::AlphaNumeric => "alpha_numeric",
            SeatLabelScheme::RoomPrefix => "room_prefix",
        }
    }
}

impl Default for SeatLabelScheme {
    fn default() -> Self {
        SeatLabelScheme::Sequential
    }
}

impl fmt::Display for SeatLabelScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SeatLabelScheme {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sequential" => Ok(SeatLabelScheme::Sequential),
            "row_col" | "row-col" => Ok(SeatLabelScheme::RowCol),
            "alpha_numeric" | "alpha-numeric" => Ok(SeatLabelScheme::AlphaNumeric),
            "room_prefix" | "room-prefix" => Ok(SeatLabelScheme::RoomPrefix),
            other => Err(EngineError::UnknownVariant {
                kind: "座位号方案",
                value: other.to_string(),
            }),
        }
    }
}

/// 生成座位号
///
/// # 参数
/// - `room_id`: 考场编号（仅 room_prefix 使用）
/// - `row` / `col`: 座位坐标，1 起始
/// - `scheme`: 座位号方案
/// - `cols`: 考场列数
///
/// # 返回
/// - Err(InvalidSeat): 坐标为 0 或列号超过列数
pub fn format_seat_label(
    room_id: &str,
    row: u32,
    col: u32,
    scheme: SeatLabelScheme,
    cols: u32,
) -> EngineResult<String> {
    if row == 0 || col == 0 || cols == 0 || col > cols {
        return Err(EngineError::InvalidSeat { row, col, cols });
    }

    let label = match scheme {
        SeatLabelScheme::Sequential => sequential_index(row, col, cols).to_string(),
        SeatLabelScheme::RowCol => format!("R{}C{}", row, col),
        SeatLabelScheme::AlphaNumeric => format!("{}{}", row_letters(row), col),
        SeatLabelScheme::RoomPrefix => {
            format!("{}-{:03}", room_id, sequential_index(row, col, cols))
        }
    };
    Ok(label)
}

/// 行优先顺序号（1 起始）
fn sequential_index(row: u32, col: u32, cols: u32) -> u64 {
    (row as u64 - 1) * cols as u64 + col as u64
}

/// 行号转字母（双射 26 进制: 1->A, 26->Z, 27->AA）
fn row_letters(row: u32) -> String {
    let mut n = row;
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push((b'A' + (n % 26) as u8) as char);
        n /= 26;
    }
    letters.iter().rev().collect()
}
