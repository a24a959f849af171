mod api;
mod catalog;
mod config;
mod customers;
mod error;
mod model;
mod order;
mod payload;
mod submit;
mod validate;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use clap::{CommandFactory, Parser, Subcommand};
use comfy_table::{Attribute, Cell, Color, Table};
use inquire::{Confirm, Password, Select, Text};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::HttpInvoicingClient;
use crate::catalog::{Catalog, load_catalog};
use crate::config::{
    AppSettings, Credentials, FormConfig, expand_home_dir, load_credentials, load_form_config,
    load_settings, save_credentials, save_settings,
};
use crate::customers::{CustomerDirectory, MIN_SEARCH_CHARS, filter_customers};
use crate::error::OrderError;
use crate::model::{Customer, CustomerRecord, OrderSummary, Product};
use crate::order::{Direction, OrderState};
use crate::submit::OrderSubmitter;
use crate::validate::{MIN_ORDER_UNITS, can_submit};

// ==========================================
// Structs & Enums
// ==========================================

#[derive(Parser)]
#[command(name = "order-form")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill in and send a new order
    New {
        /// Print the document that would be sent instead of sending it
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the product catalog
    Catalog,
    /// List or search customers
    Customers {
        /// Name or id to search for
        search: Option<String>,
    },
    /// Configure data directory and API credentials
    Config,
}

enum MenuEntry {
    PickCustomer(Option<Customer>),
    Product { id: String, label: String },
    Submit,
    Quit,
}

impl fmt::Display for MenuEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuEntry::PickCustomer(None) => write!(f, "👤 Select customer"),
            MenuEntry::PickCustomer(Some(c)) => write!(f, "👤 Customer: {}", c),
            MenuEntry::Product { label, .. } => f.write_str(label),
            MenuEntry::Submit => write!(f, "📨 Submit order"),
            MenuEntry::Quit => write!(f, "🚪 Quit"),
        }
    }
}

#[derive(Clone, Copy)]
enum ProductAction {
    Add(u32),
    Remove(u32),
    Set,
    Back,
}

impl fmt::Display for ProductAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductAction::Add(n) => write!(f, "➕ Add a pack (+{})", n),
            ProductAction::Remove(n) => write!(f, "➖ Remove a pack (-{})", n),
            ProductAction::Set => write!(f, "✏️  Type a quantity"),
            ProductAction::Back => write!(f, "↩️  Back"),
        }
    }
}

// ==========================================
// Main Function
// ==========================================

fn main() {
    init_logging();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        Cli::command().print_help().ok();
        return;
    };

    if let Err(e) = run(command) {
        error!(error = %e, "command failed");
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run(command: Commands) -> Result<(), OrderError> {
    if let Commands::Config = command {
        setup_config_wizard()?;
        return Ok(());
    }

    let settings = match load_settings() {
        Some(settings) => settings,
        None => setup_config_wizard()?,
    };
    let root = PathBuf::from(expand_home_dir(&settings.data_root));
    fs::create_dir_all(&root)
        .map_err(|e| OrderError::Config(format!("{}: {}", root.display(), e)))?;
    let form = load_form_config(&root)?;

    match command {
        Commands::New { dry_run } => run_order_wizard(&root, &form, dry_run),
        Commands::Catalog => show_catalog(&root, &form),
        Commands::Customers { search } => list_customers(&root, &form, search.as_deref()),
        Commands::Config => Ok(()),
    }
}

// ==========================================
// 1. Order Wizard
// ==========================================

fn run_order_wizard(root: &Path, form: &FormConfig, dry_run: bool) -> Result<(), OrderError> {
    let catalog_path = form.catalog_path(root);
    let catalog = load_catalog(&catalog_path)?;
    if catalog.is_empty() {
        return Err(OrderError::data_load(
            catalog_path.display().to_string(),
            "no orderable products",
        ));
    }
    println!("✅ Loaded {} products", catalog.len());

    let directory = CustomerDirectory::open(root, &form.customers)?;
    let api = HttpInvoicingClient::new(&form.api, &load_credentials()?)?;
    let submitter = OrderSubmitter::new(&api, &catalog, &form.document, form.api.lookup_page_size);

    let mut order = OrderState::new(&catalog);
    let mut customer: Option<Customer> = None;

    loop {
        print_order_status(&catalog, &order, customer.as_ref());

        let mut entries = vec![MenuEntry::PickCustomer(customer.clone())];
        for product in catalog.products() {
            entries.push(MenuEntry::Product {
                id: product.id.clone(),
                label: product_label(product, order.quantity(&product.id)),
            });
        }
        entries.push(MenuEntry::Submit);
        entries.push(MenuEntry::Quit);

        let choice = Select::new("Order (type to filter):", entries)
            .with_page_size(15)
            .prompt_skippable()?;

        match choice {
            Some(MenuEntry::PickCustomer(_)) => {
                if let Some(picked) = pick_customer(&directory, &api, form)? {
                    println!("✅ Selected Customer: {}", picked);
                    customer = Some(picked);
                }
            }
            Some(MenuEntry::Product { id, .. }) => {
                if let Some(product) = catalog.get(&id) {
                    edit_product(&mut order, product)?;
                }
            }
            Some(MenuEntry::Submit) => {
                if dry_run {
                    preview_order(&submitter, &order, customer.as_ref());
                } else if submit_order(&submitter, &catalog, &mut order, customer.as_ref())? {
                    customer = None;
                }
            }
            Some(MenuEntry::Quit) | None => {
                if !order.has_items()
                    || Confirm::new("Discard this order?").with_default(false).prompt()?
                {
                    return Ok(());
                }
            }
        }
    }
}

fn product_label(product: &Product, quantity: u32) -> String {
    format!(
        "{} [{}] | {} per pack | ₪{:.2} | qty {}",
        product.name, product.id, product.order_multiple, product.unit_price, quantity
    )
}

fn print_order_status(catalog: &Catalog, order: &OrderState, customer: Option<&Customer>) {
    let total = order.total_units();
    println!();
    match customer {
        Some(c) => println!("👤 {}", c),
        None => println!("👤 No customer selected"),
    }
    println!("📦 Total units: {} / {}", total, MIN_ORDER_UNITS);
    if order.has_items() {
        println!("💰 Total (excl. VAT): ₪{:.2}", order.summary(catalog).total_payable);
    }
    if total < MIN_ORDER_UNITS {
        println!("⚠️  A minimum of {} units is required to submit", MIN_ORDER_UNITS);
    }
}

fn edit_product(order: &mut OrderState, product: &Product) -> Result<(), OrderError> {
    let current = order.quantity(&product.id);
    let mut actions = vec![ProductAction::Add(product.order_multiple)];
    // No decrement while the line is empty
    if current > 0 {
        actions.push(ProductAction::Remove(product.order_multiple));
    }
    actions.push(ProductAction::Set);
    actions.push(ProductAction::Back);

    let prompt = format!("{} (qty {}):", product.name, current);
    let Some(action) = Select::new(&prompt, actions).prompt_skippable()? else {
        return Ok(());
    };

    let updated = match action {
        ProductAction::Add(_) => order.adjust(product, Direction::Increase),
        ProductAction::Remove(_) => order.adjust(product, Direction::Decrease),
        ProductAction::Set => {
            let help = format!("Multiples of {}; other values are rounded down", product.order_multiple);
            let default = current.to_string();
            let Some(input) = Text::new("Quantity:")
                .with_default(&default)
                .with_help_message(&help)
                .prompt_skippable()?
            else {
                return Ok(());
            };
            let input = input.trim();
            let requested: f64 = if input.is_empty() {
                0.0
            } else {
                match input.parse() {
                    Ok(value) => value,
                    Err(_) => {
                        println!("❌ '{}' is not a number, quantity unchanged.", input);
                        return Ok(());
                    }
                }
            };
            let quantity = order.set(product, requested);
            if f64::from(quantity) != requested {
                println!("ℹ️  Rounded to {} (packs of {})", quantity, product.order_multiple);
            }
            quantity
        }
        ProductAction::Back => return Ok(()),
    };

    if updated > 0 {
        println!(
            "✅ {}: {} units, ₪{:.2}",
            product.name,
            updated,
            f64::from(updated) * product.unit_price
        );
    }
    Ok(())
}

// ==========================================
// 2. Customer Selection
// ==========================================

fn pick_customer(
    directory: &CustomerDirectory,
    api: &HttpInvoicingClient,
    form: &FormConfig,
) -> Result<Option<Customer>, OrderError> {
    let candidates: Vec<CustomerRecord> = match directory {
        CustomerDirectory::Local(customers) => {
            customers.iter().cloned().map(CustomerRecord::from).collect()
        }
        CustomerDirectory::Remote => {
            let prompt = format!("Search customer (at least {} characters):", MIN_SEARCH_CHARS);
            let Some(term) = Text::new(&prompt).prompt_skippable()? else {
                return Ok(None);
            };
            match directory.search(api, &term, form.api.search_page_size) {
                Ok(found) => found,
                Err(e) => {
                    println!("❌ {}", e);
                    return Ok(None);
                }
            }
        }
    };

    if candidates.is_empty() {
        println!("❌ No matching customers found.");
        return Ok(None);
    }

    let picked = Select::new("Select customer (type to filter):", candidates)
        .with_page_size(10)
        .prompt_skippable()?;
    Ok(picked.map(Customer::from))
}

// ==========================================
// 3. Submission
// ==========================================

/// Returns true when the order was accepted and the form should start over.
fn submit_order(
    submitter: &OrderSubmitter,
    catalog: &Catalog,
    order: &mut OrderState,
    customer: Option<&Customer>,
) -> Result<bool, OrderError> {
    if let Err(e) = can_submit(order, customer) {
        println!("❌ {}", e);
        return Ok(false);
    }

    let summary = order.summary(catalog);
    println!("{}", summary_table(&summary));

    let who = customer.map(|c| c.name.as_str()).unwrap_or_default();
    if !Confirm::new(&format!("Send this order for {}?", who))
        .with_default(true)
        .prompt()?
    {
        println!("Cancelled");
        return Ok(false);
    }

    println!("\n📨 Sending order...");
    match submitter.submit(order, customer, Local::now().date_naive()) {
        Ok(submitted) => {
            let kind = if submitted.payload.is_draft { "draft" } else { "document" };
            println!(
                "✅ Order created as {} for {}: {} units, ₪{:.2}",
                kind,
                submitted.customer.name,
                submitted.payload.total_units(),
                submitted.payload.total()
            );
            if let Some(data) = &submitted.receipt.data {
                info!(response = %data, "document created");
            }
            Ok(true)
        }
        Err(e) => {
            println!("❌ {}", e);
            println!("Your order was kept, please try again.");
            Ok(false)
        }
    }
}

fn preview_order(submitter: &OrderSubmitter, order: &OrderState, customer: Option<&Customer>) {
    match submitter.prepare(order, customer, Local::now().date_naive()) {
        Ok((_, payload)) => match serde_json::to_string_pretty(&payload) {
            Ok(json) => println!("{}", json),
            Err(e) => println!("❌ Could not render document: {}", e),
        },
        Err(e) => println!("❌ {}", e),
    }
}

fn summary_table(summary: &OrderSummary) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("SKU"),
        Cell::new("Product"),
        Cell::new("Qty"),
        Cell::new("Unit Price"),
        Cell::new("Total"),
    ]);

    for line in &summary.lines {
        table.add_row(vec![
            Cell::new(&line.product_id),
            Cell::new(&line.name),
            Cell::new(line.quantity),
            Cell::new(format!("₪{:.2}", line.unit_price)),
            Cell::new(format!("₪{:.2}", line.line_total)),
        ]);
    }

    table.add_row(vec![
        Cell::new("Total (excl. VAT)").add_attribute(Attribute::Bold),
        Cell::new(""),
        Cell::new(summary.total_units).add_attribute(Attribute::Bold),
        Cell::new(""),
        Cell::new(format!("₪{:.2}", summary.total_payable)).add_attribute(Attribute::Bold),
    ]);
    table
}

// ==========================================
// 4. Catalog & Customer Listings
// ==========================================

fn show_catalog(root: &Path, form: &FormConfig) -> Result<(), OrderError> {
    let catalog = load_catalog(&form.catalog_path(root))?;
    let image_root = form.image_root(root);

    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("SKU"),
        Cell::new("Product"),
        Cell::new("Pack"),
        Cell::new("Unit Price"),
        Cell::new("Image"),
    ]);

    for product in catalog.products() {
        let image_cell = if image_root.join(&product.image_path).exists() {
            Cell::new(&product.image_path)
        } else {
            Cell::new(&product.image_path).fg(Color::Rgb { r: 185, g: 28, b: 28 })
        };
        table.add_row(vec![
            Cell::new(&product.id),
            Cell::new(&product.name),
            Cell::new(product.order_multiple),
            Cell::new(format!("₪{:.2}", product.unit_price)),
            image_cell,
        ]);
    }

    println!("\n--- Catalog ({} products) ---", catalog.len());
    println!("{table}");
    Ok(())
}

fn list_customers(root: &Path, form: &FormConfig, search: Option<&str>) -> Result<(), OrderError> {
    let directory = CustomerDirectory::open(root, &form.customers)?;
    let term = search.unwrap_or_default();

    let found = match &directory {
        // Local search needs no credentials
        CustomerDirectory::Local(all) => filter_customers(all, term)
            .into_iter()
            .cloned()
            .map(CustomerRecord::from)
            .collect::<Vec<_>>(),
        CustomerDirectory::Remote => {
            if term.trim().chars().count() < MIN_SEARCH_CHARS {
                println!("❌ Remote search needs at least {} characters.", MIN_SEARCH_CHARS);
                return Ok(());
            }
            let api = HttpInvoicingClient::new(&form.api, &load_credentials()?)?;
            directory.search(&api, term, form.api.search_page_size)?
        }
    };

    if found.is_empty() {
        println!("(None found)");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("ID"),
        Cell::new("Customer"),
        Cell::new("Phone"),
        Cell::new("Email"),
    ]);
    for c in &found {
        table.add_row(vec![
            Cell::new(c.id),
            Cell::new(&c.name),
            Cell::new(c.phone.as_deref().unwrap_or("")),
            Cell::new(c.email.as_deref().unwrap_or("")),
        ]);
    }
    println!("{table}");
    Ok(())
}

// ==========================================
// 5. Config Wizard
// ==========================================

fn setup_config_wizard() -> Result<AppSettings, OrderError> {
    println!("\n⚙️  --- Configuration Setup ---");
    let current = load_settings();
    let default_val = current
        .map(|s| s.data_root)
        .unwrap_or_else(|| "~/Documents/Orders".to_string());

    println!("📂 Opening folder picker...");
    let picked_path = rfd::FileDialog::new()
        .set_title("Select Order Data Directory")
        .pick_folder();

    let data_root = if let Some(path) = picked_path {
        path.to_string_lossy().to_string()
    } else {
        println!("❌ No folder selected. Falling back to manual input.");
        Text::new("Enter Order Data Directory:")
            .with_default(&default_val)
            .prompt()?
    };

    let settings = AppSettings { data_root };
    save_settings(&settings)?;
    println!("✅ Settings saved.");

    let replace = match load_credentials() {
        Ok(_) => Confirm::new("API credentials found. Replace them?")
            .with_default(false)
            .prompt()?,
        Err(_) => true,
    };
    if replace {
        let secret = Password::new("API secret:").without_confirmation().prompt()?;
        let userkey = Text::new("API user key:").prompt()?;
        save_credentials(&Credentials {
            secret: secret.trim().to_string(),
            userkey: userkey.trim().to_string(),
        })?;
        println!("✅ Credentials saved.");
    }

    Ok(settings)
}
