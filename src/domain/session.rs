// ==========================================
// 考场编排系统 - 考试场次领域模型
// ==========================================
// 场次键: (考试日期, 开考时间)
// 场次窗口: 用于监考冲突的区间重叠判定
// ==========================================

use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 数据库中日期的存储格式
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 数据库中开考时间的存储格式
pub const TIME_FORMAT: &str = "%H:%M";

// ==========================================
// SessionKey - 场次键
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionKey {
    pub exam_date: NaiveDate,
    pub session_time: NaiveTime,
}

impl SessionKey {
    pub fn new(exam_date: NaiveDate, session_time: NaiveTime) -> Self {
        Self {
            exam_date,
            session_time,
        }
    }

    /// 从数据库字符串解析（日期 YYYY-MM-DD, 时间 HH:MM）
    pub fn parse(exam_date: &str, session_time: &str) -> Option<Self> {
        let date = NaiveDate::parse_from_str(exam_date.trim(), DATE_FORMAT).ok()?;
        let time = NaiveTime::parse_from_str(session_time.trim(), TIME_FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(session_time.trim(), "%H:%M:%S"))
            .ok()?;
        Some(Self::new(date, time))
    }

    pub fn date_str(&self) -> String {
        self.exam_date.format(DATE_FORMAT).to_string()
    }

    pub fn time_str(&self) -> String {
        self.session_time.format(TIME_FORMAT).to_string()
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date_str(), self.time_str())
    }
}

// ==========================================
// SessionWindow - 场次时间窗口
// ==========================================
// 半开区间 [start, end)，首尾相接不算重叠
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionWindow {
    pub exam_date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl SessionWindow {
    pub fn new(exam_date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            exam_date,
            start,
            end,
        }
    }

    /// 以开考时间 + 时长构造窗口
    ///
    /// 跨越午夜时截断到 23:59:59，场次不跨日
    pub fn from_duration(key: SessionKey, minutes: i64) -> Self {
        let (end, wrapped) = key
            .session_time
            .overflowing_add_signed(Duration::minutes(minutes.max(1)));
        let end = if wrapped != 0 {
            NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(key.session_time)
        } else {
            end
        };
        Self::new(key.exam_date, key.session_time, end)
    }

    pub fn key(&self) -> SessionKey {
        SessionKey::new(self.exam_date, self.start)
    }

    /// 区间重叠判定
    pub fn overlaps(&self, other: &SessionWindow) -> bool {
        self.exam_date == other.exam_date && self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for SessionWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}-{}",
            self.exam_date.format(DATE_FORMAT),
            self.start.format(TIME_FORMAT),
            self.end.format(TIME_FORMAT)
        )
    }
}
