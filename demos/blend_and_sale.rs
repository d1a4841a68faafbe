//! 混油與油餅銷售對帳範例
//!
//! 展示混油加權成本、FIFO 出貨分配，以及銷售差額回溯到生產批次

use chrono::NaiveDate;
use oilmill_calc::{
    BatchCostEngine, BatchCostInput, BlendCostEngine, BlendInput, CostCalculator, CostContext,
    FifoAllocator, SaleInput, SalesReconciliationEngine, SeedConsumption,
};
use oilmill_core::{
    Activity, BlendComponent, CalculationMethod, CostElement, CostInput, CostingConfig,
    InventoryLot,
};
use rust_decimal::Decimal;
use std::collections::HashMap;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("===== Oil Mill Blend & Sale Example =====\n");
    let config = CostingConfig::default();
    let at = |day: u32| {
        NaiveDate::from_ymd_opt(2025, 10, day)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    };

    // 步驟 1: 兩個生產批次
    println!("[1] Production Batches");
    let batch_inputs = vec![
        BatchCostInput::new(
            "B-1001",
            SeedConsumption {
                lot_id: "SEED-A".to_string(),
                quantity_before_drying: Decimal::from(1000),
                unit_cost: Decimal::from(60),
            },
            Decimal::from(340),
        )
        .with_cake(Decimal::from(600), Decimal::from(22)),
        BatchCostInput::new(
            "B-1002",
            SeedConsumption {
                lot_id: "SEED-B".to_string(),
                quantity_before_drying: Decimal::from(800),
                unit_cost: Decimal::from(64),
            },
            Decimal::from(280),
        )
        .with_cake(Decimal::from(470), Decimal::from(23)),
    ];
    let batches = BatchCostEngine::compute_all(&batch_inputs, &config)
        .into_iter()
        .collect::<oilmill_core::Result<Vec<_>>>()?;
    for batch in &batches {
        println!(
            "    {}: net oil cost {}, per kg {}",
            batch.batch_code,
            batch.net_oil_cost,
            batch.cost_per_kg_oil.round_dp(2)
        );
    }
    println!();

    // 步驟 2: 混油
    println!("[2] Blend");
    let oil_a = InventoryLot::new(
        "OIL-1001".to_string(),
        Decimal::from(340),
        batches[0].cost_per_kg_oil,
        at(3),
    )
    .with_oil_type("Groundnut")
    .with_source_batch_code("B-1001");
    let oil_b = InventoryLot::new(
        "OIL-1002".to_string(),
        Decimal::from(280),
        batches[1].cost_per_kg_oil,
        at(4),
    )
    .with_oil_type("Sesame")
    .with_source_batch_code("B-1002");

    let blend = BlendCostEngine::compute(
        &BlendInput::new(
            "BL-1010",
            vec![
                BlendComponent::from_lot(&oil_a, Decimal::from(70)),
                BlendComponent::from_lot(&oil_b, Decimal::from(30)),
            ],
            Decimal::from(200),
        )
        .with_result_oil_type("Gingelly Blend"),
    )?;
    println!(
        "    {} ({}): {} kg @ {}",
        blend.blend_code,
        blend.oil_type,
        blend.total_quantity,
        blend.weighted_unit_cost.round_dp(2)
    );
    for (lot_id, quantity) in blend.source_decrements() {
        println!("    - draw {} kg from {}", quantity, lot_id);
    }
    println!();

    // 步驟 3: 油餅出貨（FIFO）
    println!("[3] Cake Sale Allocation");
    let mut cake_lots = vec![
        InventoryLot::new("CAKE-1002".to_string(), Decimal::from(470), Decimal::from(23), at(4))
            .with_source_batch_code("B-1002"),
        InventoryLot::new("CAKE-1001".to_string(), Decimal::from(600), Decimal::from(22), at(3))
            .with_source_batch_code("B-1001"),
    ];
    FifoAllocator::sort_oldest_first(&mut cake_lots);
    let allocation = FifoAllocator::allocate(&cake_lots, Decimal::from(750))?;
    for entry in &allocation.allocations {
        println!("    - {} × {} kg", entry.lot_id, entry.allocated_quantity);
    }
    println!();

    // 步驟 4: 銷售對帳
    println!("[4] Sale Reconciliation");
    let sale_elements = vec![
        CostElement::new(
            "cake_freight".to_string(),
            "Freight".to_string(),
            CalculationMethod::Fixed,
            Decimal::from(900),
        )
        .with_activity(Activity::Sales),
        CostElement::new(
            "cake_bags".to_string(),
            "Gunny Bags".to_string(),
            CalculationMethod::PerBag,
            Decimal::from(12),
        )
        .with_activity(Activity::Sales)
        .as_optional(),
    ];
    let mut sale_inputs = HashMap::new();
    sale_inputs.insert("cake_bags".to_string(), CostInput::applied("cake_bags"));
    let additional = CostCalculator::compute(
        &sale_elements,
        &sale_inputs,
        &CostContext::from_config(allocation.allocated_total, &config),
    )?;

    let sale = SalesReconciliationEngine::reconcile(
        &SaleInput::new("SALE-CK-77", allocation.clone(), Decimal::from(20))
            .with_additional_costs(additional),
    )?;
    println!("    Gross revenue:    {}", sale.gross_revenue);
    println!("    Additional costs: {}", sale.additional_costs_total);
    println!("    Net revenue:      {}", sale.net_revenue);
    for adjustment in &sale.lot_adjustments {
        println!(
            "    - {}: rate adj {}, cost share {}",
            adjustment.lot_id, adjustment.rate_adjustment, adjustment.additional_cost_share
        );
    }
    println!();

    // 步驟 5: 回溯批次成本並扣減庫存
    println!("[5] Corrected Batches");
    for batch in sale.apply_to_batches(&batches)? {
        println!(
            "    {}: net oil cost {} (adj {}), per kg {}",
            batch.batch_code,
            batch.net_oil_cost,
            batch.reconciliation_adjustment,
            batch.cost_per_kg_oil.round_dp(2)
        );
        for oil in [&oil_a, &oil_b] {
            let updated = batch.apply_to_lot(oil);
            if updated.unit_cost != oil.unit_cost {
                println!("    {} unit cost → {}", updated.lot_id, updated.unit_cost.round_dp(2));
            }
        }
    }
    let remaining = FifoAllocator::commit(&cake_lots, &allocation)?;
    for lot in &remaining {
        println!("    {} remaining {} kg", lot.lot_id, lot.remaining_quantity);
    }

    Ok(())
}
