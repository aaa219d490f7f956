use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use storefront_wishlist::config::Config;
use storefront_wishlist::wishlist::{WishlistController, WishlistError, WishlistSnapshot};
use storefront_wishlist::ApiClient;

/// Get the default config file path (~/.config/storefront/config.toml)
fn default_config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("storefront")
        .join("config.toml"))
}

#[derive(Parser, Debug)]
#[command(
    name = "storefront-wishlist",
    about = "Inspect and manage a storefront wishlist"
)]
struct Args {
    /// Config file (defaults to ~/.config/storefront/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile the wishlist against the catalog and print it
    List,
    /// Remove one product from the wishlist
    Remove {
        product_id: String,
    },
    /// Move a wishlist product into the cart
    AddToCart {
        product_id: String,
        /// Quantity to add (defaults to 1)
        #[arg(long)]
        quantity: Option<u32>,
    },
    /// Remove every product from the wishlist
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    tracing::debug!(?config, "Configuration resolved");

    let api = ApiClient::new(&config.api_base_url, config.request_timeout())
        .context("Failed to create API client")?;
    let controller =
        WishlistController::with_options(api, config.session(), config.controller_options());

    let outcome = run(&controller, args.command).await;
    print_snapshot(&controller.snapshot());
    controller.dispose();

    match outcome {
        Ok(()) => Ok(()),
        Err(WishlistError::AuthenticationMissing) => {
            eprintln!(
                "Error: not logged in. Set {} and {} or add auth_token/user_id to {}",
                storefront_wishlist::config::TOKEN_ENV,
                storefront_wishlist::config::USER_ID_ENV,
                config_path.display()
            );
            std::process::exit(1);
        }
        Err(e) => Err(e).context("Wishlist operation failed"),
    }
}

async fn run(controller: &WishlistController, command: Command) -> Result<(), WishlistError> {
    match command {
        Command::List => {
            let report = controller.refresh().await?;
            for outcome in &report.pruned {
                match &outcome.result {
                    Ok(()) => println!("Pruned {} (no longer in catalog)", outcome.product_id),
                    Err(warning) => eprintln!("Warning: {}", warning),
                }
            }
            Ok(())
        }
        Command::Remove { product_id } => {
            controller.refresh().await?;
            controller.remove(&product_id).await
        }
        Command::AddToCart {
            product_id,
            quantity,
        } => {
            controller.refresh().await?;
            let Some(mut item) = controller.item(&product_id) else {
                eprintln!("{} is not on the wishlist", product_id);
                return Err(WishlistError::InvalidProduct);
            };
            if quantity.is_some() {
                item.quantity = quantity;
            }
            controller.add_to_cart(&item).await
        }
        Command::Clear { yes } => {
            controller.refresh().await?;
            controller.request_clear();
            if !yes && !confirm("Remove every item from the wishlist?") {
                controller.cancel_clear();
                println!("Cancelled");
                return Ok(());
            }
            controller.confirm_clear().await
        }
    }
}

fn confirm(prompt: &str) -> bool {
    use std::io::{BufRead, Write};

    print!("{} [y/N] ", prompt);
    if std::io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim(), "y" | "Y" | "yes")
}

fn print_snapshot(snapshot: &WishlistSnapshot) {
    if let Some(error) = &snapshot.error {
        eprintln!("Error: {}", error);
    }
    for (key, message) in &snapshot.feedback {
        println!("[{}] {}", key, message);
    }

    if snapshot.items.is_empty() {
        println!("Wishlist is empty");
        return;
    }
    println!("{} item(s):", snapshot.items.len());
    for item in &snapshot.items {
        let price = item
            .price
            .map(|p| format!("{:.2}", p))
            .unwrap_or_else(|| "-".to_string());
        let added = item
            .added_at
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        println!(
            "  {:<24} {:>10}  {}  {}",
            item.product_id,
            price,
            item.name.as_deref().unwrap_or(""),
            added
        );
    }
}
