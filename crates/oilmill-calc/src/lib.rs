//! # Oil Mill Cost Engine
//!
//! 成本分攤與庫存對帳計算引擎

pub mod batch;
pub mod blend;
pub mod calculator;
pub mod fifo;
pub mod reconciliation;
pub mod time_tracker;

// Re-export 主要類型
pub use batch::{
    BatchCostEngine, BatchCostInput, BatchCostResult, ByproductRevenue, SeedConsumption,
    StageCost, YieldDiagnostics,
};
pub use blend::{BlendAllocation, BlendCostEngine, BlendCostResult, BlendInput};
pub use calculator::{CostCalculation, CostCalculator, CostContext, CostLine};
pub use fifo::{FifoAllocation, FifoAllocator, LotAllocation};
pub use reconciliation::{LotCostAdjustment, SaleCostResult, SaleInput, SalesReconciliationEngine};
pub use time_tracker::{BilledDuration, TimeCostResult, TimeTracker};

use serde::{Deserialize, Serialize};

/// 計算警告（不阻擋結果，由呼叫端決定是否確認後繼續）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostWarning {
    /// 相關對象（批號、銷售單號等）
    pub subject: String,
    pub kind: WarningKind,
    pub message: String,
    pub severity: WarningSeverity,
}

impl CostWarning {
    pub fn new(subject: &str, kind: WarningKind, message: String, severity: WarningSeverity) -> Self {
        Self {
            subject: subject.to_string(),
            kind,
            message,
            severity,
        }
    }

    pub fn info(subject: &str, kind: WarningKind, message: String) -> Self {
        Self::new(subject, kind, message, WarningSeverity::Info)
    }

    pub fn warning(subject: &str, kind: WarningKind, message: String) -> Self {
        Self::new(subject, kind, message, WarningSeverity::Warning)
    }
}

/// 警告種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// 出油量為 0，每公斤成本無法計算
    ZeroOilYield,
    /// 總收率異常偏高
    HighTotalYield,
    /// 總收率含加工添加物
    ProcessingAdditions,
    /// 庫存不足（部分分配）
    InventoryShortage,
    /// 費率缺失（降級計算）
    DegradedRates,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningSeverity {
    Info,
    Warning,
}

/// 檢查警告列表中是否含指定種類
pub fn has_warning(warnings: &[CostWarning], kind: WarningKind) -> bool {
    warnings.iter().any(|w| w.kind == kind)
}
