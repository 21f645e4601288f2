use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use query_model::{
    deep_clone, from_json, to_json, AndCondition, Condition, JoinType, Operator, QueryColumn,
    QueryJoin, QueryTable, QueryUpdate, Value,
};
use std::hint::black_box;

// AND condition with `width` leaves spread over a few named groups
fn create_condition(width: usize) -> AndCondition {
    let table = QueryTable::new("orders");
    let mut and = AndCondition::new();
    for i in 0..width {
        let condition = Condition::compare(
            Operator::EQUALS,
            QueryColumn::new(table.clone(), format!("col{i}")),
            Value::from(i as i64),
        );
        match i % 3 {
            0 => and.add_condition(condition),
            1 => and.add_named_condition("filter", condition),
            _ => and.add_named_condition("relation", condition),
        }
    }
    and
}

fn create_join(keys: usize) -> QueryJoin {
    let orders = QueryTable::new("orders");
    let customers = QueryTable::new("customers");
    let condition: AndCondition = (0..keys)
        .map(|i| {
            Condition::compare(
                Operator::EQUALS,
                QueryColumn::new(orders.clone(), format!("key{i}")),
                QueryColumn::new(customers.clone(), format!("key{i}")),
            )
        })
        .collect();
    QueryJoin::with_table(
        "orders_to_customers",
        orders,
        customers,
        condition.into(),
        JoinType::LeftOuter,
        false,
    )
    .unwrap()
}

fn create_update(columns: usize) -> QueryUpdate {
    let table = QueryTable::new("orders");
    let mut update = QueryUpdate::new(table.clone());
    for i in 0..columns {
        update.add_value(QueryColumn::new(table.clone(), format!("col{i}")), Value::from("x"));
    }
    update.set_condition(Some(create_condition(4).into()));
    update
}

fn benchmark_deep_clone(c: &mut Criterion) {
    let mut group = c.benchmark_group("deep_clone");

    for width in [4, 32, 256] {
        let condition = create_condition(width);
        group.bench_with_input(BenchmarkId::new("and_condition", width), &condition, |b, condition| {
            b.iter(|| black_box(deep_clone(black_box(condition))))
        });
    }

    group.finish();
}

fn benchmark_invert(c: &mut Criterion) {
    let mut group = c.benchmark_group("join_invert");

    for keys in [1, 4, 16] {
        let join = create_join(keys);
        group.bench_with_input(BenchmarkId::new("invert", keys), &join, |b, join| {
            b.iter(|| {
                let mut join = join.clone();
                join.invert("customers_to_orders");
                black_box(join)
            })
        });
    }

    group.finish();
}

fn benchmark_json_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("json_round_trip");

    let join = create_join(4);
    group.bench_function("join", |b| {
        b.iter(|| {
            let text = to_json(black_box(&join)).unwrap();
            let back: QueryJoin = from_json(&text).unwrap();
            black_box(back)
        })
    });

    for columns in [2, 16] {
        let update = create_update(columns);
        group.bench_with_input(BenchmarkId::new("update", columns), &update, |b, update| {
            b.iter(|| {
                let text = to_json(black_box(update)).unwrap();
                let back: QueryUpdate = from_json(&text).unwrap();
                black_box(back)
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_deep_clone,
    benchmark_invert,
    benchmark_json_round_trip
);
criterion_main!(benches);
