use std::{path::PathBuf, str::FromStr, sync::Arc};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use storefront_client::{
    api::RemovalRoute,
    config::{self, ClientConfig},
    events::UiEvent,
    models::{BehaviorAction, CartItemId, ProductId, Quantity, RegisterRequest},
    services::checkout::{
        form::FormField,
        payment_method::{CryptoAsset, PaymentMethodKind},
    },
    storage::FileTokenStore,
    views::{CartView, CheckoutView, HeaderView, OrderConfirmationView, TotalsView},
    Storefront,
};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::debug;
use url::Url;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;
    let mut events = context.storefront.state.subscribe();

    let outcome = match cli.command {
        Commands::Auth(command) => handle_auth_command(&context, command, cli.json).await,
        Commands::Cart(command) => handle_cart_command(&context, command, cli.json).await,
        Commands::Checkout(command) => handle_checkout_command(&context, command, cli.json).await,
        Commands::Payment(command) => handle_payment_command(&context, command).await,
        Commands::Track(args) => handle_track(&context, args).await,
    };

    drain_events(&mut events, cli.json)?;
    outcome
}

#[derive(Parser)]
#[command(name = "storefront", about = "Storefront client for session, cart and checkout", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(subcommand)]
    Auth(AuthCommands),
    #[command(subcommand)]
    Cart(CartCommands),
    #[command(subcommand)]
    Checkout(CheckoutCommands),
    #[command(subcommand)]
    Payment(PaymentCommands),
    /// Report a shopper action to the behaviour log
    Track(TrackArgs),
}

#[derive(Subcommand)]
enum AuthCommands {
    Login(AuthLoginArgs),
    Register(AuthRegisterArgs),
    Logout,
    Whoami,
}

#[derive(Args)]
struct AuthLoginArgs {
    #[arg(long, help = "Account username")]
    username: String,
    #[arg(long, help = "Account password")]
    password: String,
}

#[derive(Args)]
struct AuthRegisterArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    username: String,
    #[arg(long)]
    password: String,
    #[arg(long, help = "Full name used to prefill checkout")]
    full_name: Option<String>,
}

#[derive(Subcommand)]
enum CartCommands {
    Show,
    Add(CartAddArgs),
    Remove(CartRemoveArgs),
    Update(CartUpdateArgs),
    Clear,
    /// Go to checkout (requires a signed-in shopper)
    Checkout,
}

#[derive(Args)]
struct CartAddArgs {
    product_id: i64,
    #[arg(long, value_parser = parse_quantity, help = "Units to add (1-99, default 1)")]
    quantity: Option<Quantity>,
}

#[derive(Args)]
struct CartRemoveArgs {
    item_id: i64,
    #[arg(
        long,
        action = ArgAction::SetTrue,
        help = "Use the checkout page's removal route"
    )]
    canonical: bool,
}

#[derive(Args)]
struct CartUpdateArgs {
    item_id: i64,
    #[arg(allow_hyphen_values = true, help = "New quantity; clamped to 1-99")]
    quantity: i64,
}

#[derive(Subcommand)]
enum CheckoutCommands {
    Totals,
    Submit(CheckoutSubmitArgs),
}

#[derive(Args)]
struct CheckoutSubmitArgs {
    #[arg(long, value_parser = PaymentMethodKind::from_str)]
    method: Option<PaymentMethodKind>,
    #[arg(long)]
    first_name: Option<String>,
    #[arg(long)]
    last_name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    postal_code: Option<String>,
    #[arg(long)]
    notes: Option<String>,
    #[arg(long, action = ArgAction::SetTrue)]
    accept_terms: bool,
    #[arg(long)]
    mobile_provider: Option<String>,
    #[arg(long)]
    mobile_number: Option<String>,
    #[arg(long)]
    paypal_email: Option<String>,
    #[arg(long)]
    card_number: Option<String>,
    #[arg(long)]
    card_expiry: Option<String>,
    #[arg(long)]
    card_cvv: Option<String>,
    #[arg(long)]
    card_name: Option<String>,
    #[arg(long, value_parser = CryptoAsset::from_str)]
    crypto_asset: Option<CryptoAsset>,
}

#[derive(Subcommand)]
enum PaymentCommands {
    /// Verify the payment referenced by a gateway return URL
    Callback { url: Url },
}

#[derive(Args)]
struct TrackArgs {
    #[arg(value_parser = BehaviorAction::from_str)]
    action: BehaviorAction,
    product_id: i64,
}

struct CliContext {
    storefront: Storefront,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load client config")?;
        config::init_tracing(&config.log_level, config.log_json);

        let token_path = token_store_path(&config)?;
        debug!(path = %token_path.display(), "using token store");

        let storefront = Storefront::connect(config, Arc::new(FileTokenStore::new(token_path)))
            .context("failed to build backend client")?;
        storefront.session.initialize().await;

        Ok(Self { storefront })
    }
}

fn token_store_path(config: &ClientConfig) -> Result<PathBuf> {
    config
        .token_store_path
        .as_ref()
        .map(PathBuf::from)
        .or_else(FileTokenStore::default_path)
        .ok_or_else(|| anyhow!("no home directory; set STOREFRONT__TOKEN_STORE_PATH"))
}

async fn handle_auth_command(context: &CliContext, command: AuthCommands, json: bool) -> Result<()> {
    let storefront = &context.storefront;
    match command {
        AuthCommands::Login(args) => {
            storefront
                .session
                .login(&args.username, &args.password)
                .await
                .context("login failed")?;
        }
        AuthCommands::Register(args) => {
            storefront
                .session
                .register(RegisterRequest {
                    email: args.email,
                    username: args.username,
                    full_name: args.full_name,
                    password: args.password,
                })
                .await
                .context("registration failed")?;
        }
        AuthCommands::Logout => {
            storefront.session.logout();
        }
        AuthCommands::Whoami => {
            let header = HeaderView::from_state(&storefront.state);
            if json {
                print_json(&header)?;
            } else {
                match header {
                    HeaderView::SignedIn {
                        username,
                        is_admin,
                        cart_badge,
                    } => println!(
                        "Signed in as {}{} • {} item(s) in cart",
                        username,
                        if is_admin { " (admin)" } else { "" },
                        cart_badge
                    ),
                    HeaderView::SignedOut => println!("Not signed in"),
                }
            }
        }
    }
    Ok(())
}

async fn handle_cart_command(context: &CliContext, command: CartCommands, json: bool) -> Result<()> {
    let storefront = &context.storefront;
    let cart = &storefront.cart;
    match command {
        CartCommands::Show => {
            let snapshot = cart.open()?;
            render_cart(&CartView::render(&snapshot, storefront.state.pricing()), json)?;
            return Ok(());
        }
        CartCommands::Add(args) => cart.add(ProductId(args.product_id), args.quantity).await?,
        CartCommands::Remove(args) => {
            let route = if args.canonical {
                RemovalRoute::Canonical
            } else {
                RemovalRoute::Legacy
            };
            cart.remove(CartItemId(args.item_id), route).await?
        }
        CartCommands::Update(args) => {
            cart.update_quantity(CartItemId(args.item_id), args.quantity)
                .await?;
        }
        CartCommands::Clear => cart.clear().await?,
        CartCommands::Checkout => {
            cart.require_checkout()?;
            return Ok(());
        }
    }

    let view = CartView::render(&storefront.state.cart(), storefront.state.pricing());
    render_cart(&view, json)
}

async fn handle_checkout_command(
    context: &CliContext,
    command: CheckoutCommands,
    json: bool,
) -> Result<()> {
    let storefront = &context.storefront;
    let pricing = storefront.state.pricing();
    let mut checkout = storefront.checkout();
    checkout.load().await.context("failed to load checkout")?;

    match command {
        CheckoutCommands::Totals => {
            let totals = TotalsView::render(&checkout.totals(), pricing);
            if json {
                print_json(&totals)?;
            } else {
                render_totals(&totals);
            }
        }
        CheckoutCommands::Submit(args) => {
            let fields = [
                (FormField::FirstName, args.first_name),
                (FormField::LastName, args.last_name),
                (FormField::Email, args.email),
                (FormField::Phone, args.phone),
                (FormField::Address, args.address),
                (FormField::City, args.city),
                (FormField::PostalCode, args.postal_code),
                (FormField::OrderNotes, args.notes),
            ];
            for (field, value) in fields {
                if let Some(value) = value {
                    checkout.set_field(field, value)?;
                }
            }
            checkout.accept_terms(args.accept_terms)?;

            if let Some(kind) = args.method {
                checkout.select_payment_method(kind)?;
            }
            if let Some(provider) = args.mobile_provider {
                checkout.set_mobile_provider(provider)?;
            }
            if let Some(number) = args.mobile_number {
                checkout.set_mobile_number(&number)?;
            }
            if let Some(email) = args.paypal_email {
                checkout.set_paypal_email(email)?;
            }
            if let Some(number) = args.card_number {
                checkout.set_card_number(&number)?;
            }
            if let Some(expiry) = args.card_expiry {
                checkout.set_card_expiry(&expiry)?;
            }
            if let Some(cvv) = args.card_cvv {
                checkout.set_card_cvv(&cvv)?;
            }
            if let Some(name) = args.card_name {
                checkout.set_card_name(name)?;
            }
            if args.crypto_asset.is_some() {
                checkout.select_crypto_asset(args.crypto_asset)?;
            }

            let view = CheckoutView::render(&checkout, pricing);
            if let Some(advisory) = view.card_advisory {
                eprintln!("warning: {}", advisory);
            }

            let result = checkout.submit().await;
            if json {
                print_json(&CheckoutView::render(&checkout, pricing))?;
            }
            result.context("checkout failed")?;

            if let Some(order) = checkout.order() {
                let confirmation = OrderConfirmationView::render(order, pricing);
                if json {
                    print_json(&confirmation)?;
                } else {
                    println!("{} {}", confirmation.title, confirmation.order_number);
                    println!("Total Amount: {}", confirmation.total_amount);
                    println!("Status: {}", confirmation.status);
                    println!("Shipping Address: {}", confirmation.shipping_address);
                }
            }
        }
    }
    Ok(())
}

async fn handle_payment_command(context: &CliContext, command: PaymentCommands) -> Result<()> {
    match command {
        PaymentCommands::Callback { url } => {
            let handled = context.storefront.payments.handle(&url).await?;
            if handled.is_none() {
                println!("Not a payment callback URL: {}", url);
            }
        }
    }
    Ok(())
}

async fn handle_track(context: &CliContext, args: TrackArgs) -> Result<()> {
    let sent = context
        .storefront
        .analytics
        .track_now(args.action, Some(ProductId(args.product_id)))
        .await?;
    if !sent {
        println!("Skipped: not signed in");
    }
    Ok(())
}

fn drain_events(events: &mut broadcast::Receiver<UiEvent>, json: bool) -> Result<()> {
    loop {
        match events.try_recv() {
            Ok(UiEvent::Notice { level, message }) => {
                if json {
                    print_json(&serde_json::json!({"notice": level, "message": message}))?;
                } else {
                    println!("[{}] {}", level, message);
                }
            }
            Ok(UiEvent::Navigate(redirect)) => {
                if json {
                    print_json(&serde_json::json!({
                        "redirect": redirect.location,
                        "delay_ms": redirect.delay.as_millis() as u64,
                    }))?;
                } else if redirect.delay.is_zero() {
                    println!("→ {}", redirect.location);
                } else {
                    println!("→ {} (after {}ms)", redirect.location, redirect.delay.as_millis());
                }
            }
            Ok(other) => debug!(event = ?other, "state event"),
            Err(TryRecvError::Lagged(skipped)) => debug!(skipped, "event stream lagged"),
            Err(TryRecvError::Empty | TryRecvError::Closed) => return Ok(()),
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_cart(view: &CartView, json: bool) -> Result<()> {
    if json {
        return print_json(view);
    }
    if let Some(message) = view.empty_message {
        println!("{}", message);
    }
    for row in &view.rows {
        println!(
            "- #{} {} • {} • {}",
            row.item_id, row.product_name, row.price_line, row.line_total
        );
    }
    render_totals(&view.totals);
    Ok(())
}

fn render_totals(totals: &TotalsView) {
    println!("Subtotal: {}", totals.subtotal);
    println!(
        "Shipping: {}{}",
        totals.shipping,
        if totals.free_shipping { " (free)" } else { "" }
    );
    println!("Tax: {}", totals.tax);
    println!("Total: {}", totals.total);
}

fn parse_quantity(raw: &str) -> Result<Quantity, String> {
    let value: u32 = raw
        .parse()
        .map_err(|e| format!("invalid quantity '{}': {}", raw, e))?;
    Quantity::new(value).ok_or_else(|| {
        format!(
            "quantity must be between {} and {}",
            Quantity::MIN,
            Quantity::MAX
        )
    })
}
