//! 成本引擎效能測試

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use oilmill_calc::{CostCalculator, CostContext, FifoAllocator};
use oilmill_core::{CalculationMethod, CostElement, CostInput, InventoryLot};
use rust_decimal::Decimal;
use std::collections::HashMap;

fn build_lots(count: usize) -> Vec<InventoryLot> {
    let start = NaiveDate::from_ymd_opt(2025, 1, 1)
        .unwrap()
        .and_hms_opt(6, 0, 0)
        .unwrap();
    (0..count)
        .map(|i| {
            InventoryLot::new(
                format!("LOT-{:05}", i),
                Decimal::from(40),
                Decimal::from(18 + (i % 5) as i64),
                start + chrono::Duration::hours(i as i64),
            )
        })
        .collect()
}

fn build_elements(count: usize) -> Vec<CostElement> {
    let methods = [
        CalculationMethod::PerKg,
        CalculationMethod::PerBag,
        CalculationMethod::PerHour,
        CalculationMethod::Fixed,
    ];
    (0..count)
        .map(|i| {
            let element = CostElement::new(
                format!("E{:03}", i),
                format!("要素 {}", i),
                methods[i % methods.len()],
                Decimal::new(125 + i as i64, 2),
            );
            if i % 3 == 0 {
                element.as_optional()
            } else {
                element
            }
        })
        .collect()
}

fn bench_fifo_allocate(c: &mut Criterion) {
    let mut group = c.benchmark_group("fifo_allocate");

    for count in [10, 100, 1000] {
        let lots = build_lots(count);
        let requested = Decimal::from(count as i64 * 30);
        group.bench_with_input(BenchmarkId::from_parameter(count), &lots, |b, lots| {
            b.iter(|| FifoAllocator::allocate(black_box(lots), black_box(requested)))
        });
    }

    group.finish();
}

fn bench_cost_calculator(c: &mut Criterion) {
    let elements = build_elements(40);
    let inputs: HashMap<String, CostInput> = elements
        .iter()
        .filter(|e| e.is_optional)
        .map(|e| (e.element_id.clone(), CostInput::applied(&e.element_id)))
        .collect();
    let context = CostContext::new(Decimal::from(1240))
        .with_oil_yield(Decimal::from(410))
        .with_hours(Decimal::from(6));

    c.bench_function("cost_calculator_40_elements", |b| {
        b.iter(|| CostCalculator::compute(black_box(&elements), black_box(&inputs), &context))
    });
}

criterion_group!(benches, bench_fifo_allocate, bench_cost_calculator);
criterion_main!(benches);
