use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::Utc;
use std::sync::Arc;
use stockwise_inventory::{Adjustment, Quantity, QuantityInput, UploadMode, reconcile};
use stockwise_infra::service::{BulkRow, BulkUpload, InventoryService, StockDefaults};
use stockwise_infra::store::{InMemoryInventoryStore, InventoryStore};
use stockwise_products::{CatalogKey, NewProduct};

const CATALOG_SIZE: usize = 200;

fn catalog_row(i: usize, qty: i64) -> BulkRow {
    BulkRow {
        product_type: "Premium".to_string(),
        brand: format!("BRAND-{}", i % 20),
        category: "L2".to_string(),
        name: format!("Product {i}"),
        quantity: Some(QuantityInput::Integer(qty)),
        ..BulkRow::default()
    }
}

fn seeded_service(rt: &tokio::runtime::Runtime) -> InventoryService<Arc<InMemoryInventoryStore>> {
    let store = Arc::new(InMemoryInventoryStore::new());
    rt.block_on(async {
        for i in 0..CATALOG_SIZE {
            let row = catalog_row(i, 0);
            let key = CatalogKey::new(&row.product_type, &row.brand, &row.category, &row.name)
                .expect("valid catalog key");
            store
                .insert_product(NewProduct::new(key, None).into_product(Utc::now()))
                .await
                .expect("insert product");
        }
    });
    InventoryService::new(store, StockDefaults::default())
}

fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");
    let on_hand = Quantity::new(1_000).unwrap();
    let amount = Quantity::new(250).unwrap();

    group.bench_function("add", |b| {
        b.iter(|| black_box(reconcile(black_box(on_hand), Adjustment::Add(amount)).unwrap()))
    });
    group.bench_function("subtract", |b| {
        b.iter(|| black_box(reconcile(black_box(on_hand), Adjustment::Subtract(amount)).unwrap()))
    });
    group.finish();
}

fn bench_bulk_upload(c: &mut Criterion) {
    let mut group = c.benchmark_group("bulk_upload");
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("tokio runtime");

    for batch_size in [10usize, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*batch_size as u64));
        for mode in [UploadMode::Add, UploadMode::Replace] {
            group.bench_with_input(
                BenchmarkId::new(format!("{mode:?}").to_lowercase(), batch_size),
                batch_size,
                |b, &size| {
                    let service = seeded_service(&rt);
                    let rows: Vec<BulkRow> = (0..size).map(|i| catalog_row(i % CATALOG_SIZE, 5)).collect();

                    b.iter(|| {
                        let upload = BulkUpload {
                            rows: rows.clone(),
                            upload_type: mode,
                        };
                        black_box(rt.block_on(service.bulk_upload(upload, "bench")));
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_reconcile, bench_bulk_upload);
criterion_main!(benches);
