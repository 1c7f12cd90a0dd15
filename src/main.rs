use clap::Parser;
use miette::{IntoDiagnostic, Result};
use shopcore::application::cart::CartService;
use shopcore::application::orders::OrderEngine;
use shopcore::application::payments::PaymentEngine;
use shopcore::domain::money::Price;
use shopcore::domain::ports::{
    CartStoreRef, InventoryStoreRef, OrderStoreRef, PaymentStoreRef,
};
use shopcore::domain::product::{Product, UserProfile};
use shopcore::error::CommerceError;
use shopcore::infrastructure::in_memory::{
    InMemoryCartStore, InMemoryCatalog, InMemoryInventoryStore, InMemoryOrderStore,
    InMemoryPaymentStore, InMemoryUserDirectory,
};
use shopcore::infrastructure::notify::LogNotifier;
use shopcore::interfaces::csv::event_reader::{Event, EventReader, EventType};
use shopcore::interfaces::csv::report_writer::OrderReportWriter;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input commerce events CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

struct Engines {
    catalog: Arc<InMemoryCatalog>,
    users: Arc<InMemoryUserDirectory>,
    inventory: InventoryStoreRef,
    carts: CartService,
    orders: OrderEngine,
    payments: PaymentEngine,
    order_store: OrderStoreRef,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let (inventory, cart_store, order_store, payment_store) = build_stores(&cli)?;

    let catalog = Arc::new(InMemoryCatalog::new());
    let users = Arc::new(InMemoryUserDirectory::new());
    let notifier = Arc::new(LogNotifier::new());

    let engines = Engines {
        catalog: catalog.clone(),
        users: users.clone(),
        inventory: inventory.clone(),
        carts: CartService::new(
            cart_store.clone(),
            inventory.clone(),
            catalog,
            users.clone(),
        ),
        orders: OrderEngine::new(
            order_store.clone(),
            cart_store,
            inventory,
            users.clone(),
            notifier.clone(),
        ),
        payments: PaymentEngine::new(payment_store, order_store.clone(), users, notifier),
        order_store,
    };

    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = EventReader::new(file);
    for event_result in reader.events() {
        match event_result {
            Ok(event) => {
                if let Err(e) = apply(&engines, event).await {
                    eprintln!("Error processing event: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading event: {}", e);
            }
        }
    }

    let orders = engines.order_store.all().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = OrderReportWriter::new(stdout.lock());
    writer.write_orders(&orders).into_diagnostic()?;

    Ok(())
}

async fn apply(engines: &Engines, event: Event) -> shopcore::error::Result<()> {
    match event.r#type {
        EventType::Product => {
            let id = require(event.product, "product")?;
            let price = Price::new(require(event.amount, "amount")?)?;
            let name = require(event.name, "name")?;
            engines.catalog.add_product(Product::new(id, name, price)).await;
        }
        EventType::User => {
            engines
                .users
                .add_user(UserProfile {
                    id: require(event.user, "user")?,
                    username: require(event.name, "name")?,
                    email: require(event.email, "email")?,
                })
                .await;
        }
        EventType::Stock => {
            engines
                .inventory
                .set_quantity(require(event.product, "product")?, require(event.qty, "qty")?)
                .await?;
        }
        EventType::Add => {
            engines
                .carts
                .add_item(
                    require(event.user, "user")?,
                    require(event.product, "product")?,
                    require(event.qty, "qty")?,
                )
                .await?;
        }
        EventType::Place => {
            engines.orders.place_order(require(event.user, "user")?).await?;
        }
        EventType::Init => {
            engines
                .payments
                .initiate_payment(require(event.order, "order")?, event.name.as_deref())
                .await?;
        }
        EventType::Pay => {
            engines
                .payments
                .confirm_payment(require(event.order, "order")?, event.name)
                .await?;
        }
        EventType::Fail => {
            engines
                .payments
                .fail_payment(require(event.order, "order")?)
                .await?;
        }
    }
    Ok(())
}

fn require<T>(field: Option<T>, name: &str) -> shopcore::error::Result<T> {
    field.ok_or_else(|| CommerceError::Validation(format!("event missing {name} field")))
}

#[cfg(feature = "storage-rocksdb")]
fn build_stores(
    cli: &Cli,
) -> Result<(InventoryStoreRef, CartStoreRef, OrderStoreRef, PaymentStoreRef)> {
    use shopcore::infrastructure::rocksdb::RocksDbStore;

    if let Some(db_path) = &cli.db_path {
        let store = RocksDbStore::open(db_path).into_diagnostic()?;
        return Ok((
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store),
        ));
    }
    Ok(in_memory_stores())
}

#[cfg(not(feature = "storage-rocksdb"))]
fn build_stores(
    cli: &Cli,
) -> Result<(InventoryStoreRef, CartStoreRef, OrderStoreRef, PaymentStoreRef)> {
    if cli.db_path.is_some() {
        miette::bail!("--db-path requires building with the storage-rocksdb feature");
    }
    Ok(in_memory_stores())
}

fn in_memory_stores() -> (InventoryStoreRef, CartStoreRef, OrderStoreRef, PaymentStoreRef) {
    (
        Arc::new(InMemoryInventoryStore::new()),
        Arc::new(InMemoryCartStore::new()),
        Arc::new(InMemoryOrderStore::new()),
        Arc::new(InMemoryPaymentStore::new()),
    )
}
