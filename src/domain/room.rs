// ==========================================
// 考场编排系统 - 考场领域模型
// ==========================================
// 红线: capacity 必须等于 rows * cols，编排前校验
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// Room - 考场
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub room_id: String,  // 考场编号
    pub name: String,     // 考场名称
    pub rows: u32,        // 行数
    pub cols: u32,        // 列数
    pub capacity: u32,    // 座位数
}

impl Room {
    /// 以行列构造考场（capacity = rows * cols）
    pub fn new(room_id: impl Into<String>, rows: u32, cols: u32) -> Self {
        let room_id = room_id.into();
        Self {
            name: room_id.clone(),
            room_id,
            rows,
            cols,
            capacity: rows.saturating_mul(cols),
        }
    }

    /// 网格座位数（行 × 列），溢出时为 None
    pub fn grid_size(&self) -> Option<u32> {
        self.rows.checked_mul(self.cols)
    }

    /// 校验考场几何参数
    ///
    /// # 返回
    /// - Ok(()): 合法
    /// - Err(reason): 不合法原因
    pub fn validate(&self) -> Result<(), String> {
        if self.room_id.trim().is_empty() {
            return Err("room_id 为空".to_string());
        }
        if self.rows == 0 || self.cols == 0 {
            return Err(format!(
                "行列必须大于0 (rows={}, cols={})",
                self.rows, self.cols
            ));
        }
        let grid_size = self.grid_size().ok_or_else(|| {
            format!("rows({}) × cols({}) 超出座位数上限", self.rows, self.cols)
        })?;
        if self.capacity != grid_size {
            return Err(format!(
                "capacity({}) != rows({}) × cols({}) = {}",
                self.capacity, self.rows, self.cols, grid_size
            ));
        }
        Ok(())
    }
}
