// ==========================================
// 考场编排系统 - 考生领域模型
// ==========================================
// 一次编排运行内不可变
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// Candidate - 考生（按报考科目展开）
// ==========================================
// 同一考生在同一场次内只能出现一次
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,           // 学号
    pub name: String,         // 姓名
    pub department: String,   // 所属院系
    pub subject_code: String, // 报考科目
}

impl Candidate {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        department: impl Into<String>,
        subject_code: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            department: department.into(),
            subject_code: subject_code.into(),
        }
    }

    /// 是否与另一考生同院系
    pub fn same_department(&self, other: &Candidate) -> bool {
        self.department == other.department
    }

    /// 是否与另一考生同科目
    pub fn same_subject(&self, other: &Candidate) -> bool {
        self.subject_code == other.subject_code
    }
}
