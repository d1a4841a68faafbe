//! # Oil Mill
//!
//! 榨油廠成本分攤與庫存對帳引擎
//!
//! - [`model`]：成本要素主檔、庫存批次、設定等資料模型
//! - [`calc`]：成本計算、批次/調和成本、FIFO 分配、銷售對帳

pub use oilmill_calc as calc;
pub use oilmill_core as model;

pub use oilmill_calc::{
    BatchCostEngine, BatchCostInput, BatchCostResult, BlendCostEngine, BlendInput, CostCalculator,
    CostContext, CostWarning, FifoAllocator, SaleInput, SalesReconciliationEngine, TimeTracker,
    WarningKind,
};
pub use oilmill_core::{
    CostElement, CostElementCatalog, CostError, CostInput, CostingConfig, InventoryLot, Result,
};
