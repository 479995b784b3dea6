//! Filter and paginate orders on both builder kinds
//!
//! This example demonstrates:
//! - Loading the toolkit configuration from YAML
//! - Validating a date range before filtering
//! - Dispatching the same criteria onto a query and an aggregation builder
//! - Count-then-fetch pagination against the in-memory store
//!
//! Run with `RUST_LOG=odm=debug cargo run --example paginate` to see the
//! dispatcher and paginator diagnostics.

use anyhow::Result;
use odm::prelude::*;
use tracing_subscriber::EnvFilter;

const CONFIG: &str = r#"
pagination:
  default_limit: 3
  max_limit: 10
date_range:
  format: Y-m-d
  allow_equal: false
"#;

#[derive(Debug, Default, Serialize, Deserialize)]
struct OrderCriteria {
    date: Option<RangeValue>,
    status: Option<String>,
    sort: Option<Vec<String>>,
}

fn seed(store: &InMemoryStore) -> Result<()> {
    let statuses = ["paid", "draft", "paid", "refunded"];
    store.insert_many(
        "orders",
        (1..=20).map(|n| {
            doc! {
                "number": format!("A-{:03}", n),
                "status": statuses[n as usize % statuses.len()],
                "total": f64::from(n) * 7.5,
                "createdAt": format!("2025-01-{:02}", n),
            }
        }),
    )?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("📦 ODM Toolkit Pagination Example");
    println!("=================================\n");

    let config = OdmConfig::from_yaml_str(CONFIG)?;
    let store = InMemoryStore::new();
    seed(&store)?;
    println!("✅ Seeded {} orders\n", store.len("orders")?);

    let criteria = OrderCriteria {
        date: Some(RangeValue::new(Some("2025-01-05"), Some("2025-01-16"))),
        status: Some("paid".to_string()),
        sort: Some(vec!["-total".to_string()]),
    };

    let rule = DateRangeRule::from(&config.date_range);
    let outcome = rule.check_range(criteria.date.as_ref().unwrap_or(&RangeValue::default()));
    if let Some(code) = outcome.code() {
        anyhow::bail!("date range rejected: {}", code);
    }

    let dispatcher = FilterDispatcher::new()
        .range("date", "createdAt")
        .sort("sort")
        .on_query("status", |qb, value| {
            qb.field("status").equals(value.as_str().unwrap_or_default());
            Ok(())
        })
        .on_aggregation("status", |stage, value| {
            stage.field("status").equals(value.as_str().unwrap_or_default());
            Ok(())
        });

    let paginator = BuilderAwarePaginator::new(store);
    let page = PageParams {
        offset: 1,
        limit: None,
    }
    .paginator(&config.pagination);

    for kind in [BuilderKind::Query, BuilderKind::Aggregation] {
        let mut builder = BuilderHandle::new(kind, "orders");
        dispatcher.dispatch_criteria(&mut builder, &criteria)?;

        let result = paginator.paginate(builder, page).await?;
        let meta = result.meta(&page);

        println!(
            "🔎 {} builder: {} matching, showing {}",
            kind,
            result.total,
            result.items.len()
        );
        for order in &result.items {
            println!(
                "   - {} {} {:.2}",
                order.get_str("number")?,
                order.get_str("createdAt")?,
                order.get_f64("total")?
            );
        }
        println!("   has_prev={} has_next={}\n", meta.has_prev, meta.has_next);
    }

    Ok(())
}
