//! 生產批次成本計算範例
//!
//! 從成本要素主檔開始，計算基本成本、各階段延伸成本，最後彙總批次成本

use chrono::NaiveDate;
use oilmill_calc::{
    BatchCostEngine, BatchCostInput, CostCalculation, CostCalculator, CostContext,
    SeedConsumption, TimeTracker,
};
use oilmill_core::{Activity, CostElementCatalog, CostInput, CostingConfig};
use rust_decimal::Decimal;
use std::collections::HashMap;

const CATALOG: &str = r#"[
    {"element_id": "labour", "name": "Labour", "category": "Labor", "calculation_method": "per_hour", "default_rate": "120"},
    {"element_id": "electricity", "name": "Electricity", "category": "Utilities", "calculation_method": "per_hour", "default_rate": "35"},
    {"element_id": "oil_tins", "name": "Oil Tins", "category": "Consumables", "activity": "Common", "calculation_method": "per_kg", "default_rate": "1.5", "is_optional": true},
    {"element_id": "dryer_fuel", "name": "Dryer Fuel", "activity": "Drying", "calculation_method": "per_kg", "default_rate": "0.4"},
    {"element_id": "crushing_labour", "name": "Crushing Labour", "activity": "Crushing", "calculation_method": "per_kg", "default_rate": "2"},
    {"element_id": "bagging", "name": "Cake Bagging", "activity": "Crushing", "calculation_method": "per_bag", "default_rate": "6", "is_optional": true},
    {"element_id": "filter_press", "name": "Filter Press Rent", "activity": "Filtering", "calculation_method": "fixed", "default_rate": "800"}
]"#;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("===== Oil Mill Batch Costing Example =====\n");

    // 步驟 1: 載入主檔與設定
    println!("[1] Load Cost Element Catalog");
    let catalog = CostElementCatalog::from_json_str(CATALOG)?;
    let config = CostingConfig::from_json_str(r#"{"bag_divisor": "45"}"#)?;
    println!("    Elements: {}", catalog.len());
    println!("    Bag divisor: {} kg\n", config.bag_divisor);

    // 步驟 2: 工時
    println!("[2] Billed Hours");
    let day = NaiveDate::from_ymd_opt(2025, 10, 2).unwrap();
    let start = day.and_hms_opt(7, 30, 0).unwrap();
    let end = day.and_hms_opt(15, 10, 0).unwrap();
    let time_cost = TimeTracker::cost("B-2510-01", start, end, &catalog, &config)?;
    println!(
        "    Actual {} h → billed {} h, time cost {}\n",
        time_cost.duration.actual_hours.round_dp(2),
        time_cost.duration.billed_hours,
        time_cost.cost
    );

    // 步驟 3: 基本成本
    println!("[3] Basic Costs");
    let mass_before = Decimal::from(1200);
    let mass_after = Decimal::from(1130);
    let oil_yield = Decimal::from(402);

    let mut basic_inputs = HashMap::new();
    basic_inputs.insert("oil_tins".to_string(), CostInput::applied("oil_tins"));
    let basic = CostCalculator::compute(
        &catalog.basic_elements(),
        &basic_inputs,
        &CostContext::from_config(mass_after, &config)
            .with_billed_duration(time_cost.duration)
            .with_oil_yield(oil_yield),
    )?;
    print_lines(&basic);

    // 步驟 4: 各階段延伸成本
    println!("[4] Stage Costs");
    let context = CostContext::from_config(mass_after, &config).with_masses(mass_before, mass_after);
    let mut stage_inputs = HashMap::new();
    stage_inputs.insert(
        "bagging".to_string(),
        CostInput::applied("bagging").with_override_str("5.5")?,
    );

    let mut input = BatchCostInput::new(
        "B-2510-01",
        SeedConsumption {
            lot_id: "SEED-GN-0917".to_string(),
            quantity_before_drying: mass_before,
            unit_cost: Decimal::from(62),
        },
        oil_yield,
    )
    .with_mass_after(mass_after)
    .with_cake(Decimal::from(690), Decimal::from(24))
    .with_sludge(Decimal::from(18), Decimal::from(8))
    .with_basic_costs(basic);

    for activity in [Activity::Drying, Activity::Crushing, Activity::Filtering] {
        let stage =
            CostCalculator::compute(&catalog.stage_elements(&activity), &stage_inputs, &context)?;
        println!("    {}:", activity);
        print_lines(&stage);
        input = input.with_stage_cost(activity, stage);
    }

    // 步驟 5: 彙總
    println!("[5] Batch Result");
    let result = BatchCostEngine::compute(&input, &config)?;
    println!("    Seed cost:        {}", result.seed_cost);
    println!("    Basic total:      {}", result.basic_total);
    println!("    Extended total:   {}", result.extended_total);
    println!("    Production cost:  {}", result.total_production_cost);
    println!("    By-product value: {}", result.byproduct_revenue.total);
    println!("    Net oil cost:     {}", result.net_oil_cost);
    println!("    Cost per kg oil:  {}", result.cost_per_kg_oil.round_dp(2));
    println!(
        "    Total yield:      {}%",
        result.diagnostics.total_yield_percent.round_dp(1)
    );
    for warning in &result.warnings {
        println!("    ⚠ {:?}: {}", warning.kind, warning.message);
    }

    println!("\n{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

fn print_lines(calculation: &CostCalculation) {
    for line in calculation.applied_lines() {
        println!(
            "    - {:<18} {:>8} × {:>6} = {}",
            line.element_name, line.quantity, line.rate, line.total
        );
    }
    println!("    Subtotal: {}\n", calculation.total);
}
