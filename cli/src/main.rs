use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use rentify::api::bookings::{self, BookingAction};
use rentify::api::reviews::{self, ReturnReport, ReviewDraft};
use rentify::api::types::{BookingDraft, Condition, ItemDraft, ItemQuery, ProfileUpdate, RegisterRequest, ReviewKind};
use rentify::api::{auth, items, wishlist};
use rentify::dashboard;
use rentify::{ApiError, ClientConfig, ConfigError, FileStore, ReqwestTransport, SessionManager, StoreError};
use serde::Serialize;
use serde_json::json;
use tracing::debug;
use tracing::level_filters::LevelFilter;

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{}: {}", .0.error_code(), .0.user_message())]
    Api(#[from] ApiError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("session file unusable: {0}")]
    Store(#[from] StoreError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("unknown condition `{0}`; expected new, like_new, good, fair, or poor")]
    InvalidCondition(String),
    #[error("unknown review kind `{0}`; expected item, owner, or renter")]
    InvalidReviewKind(String),
    #[error("invalid aspect rating `{0}`; expected name=1..5")]
    InvalidAspect(String),
}

#[derive(Parser, Debug)]
#[command(name = "rentify", about = "Rentify rental marketplace CLI")]
struct Cli {
    #[arg(long, env = "RENTIFY_API_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "RENTIFY_SESSION_FILE")]
    session_file: Option<PathBuf>,

    #[arg(long, env = "RENTIFY_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "RENTIFY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        user_name: String,
        #[arg(long, env = "RENTIFY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Show the cached identity and the server's profile.
    Whoami,
    /// Change profile fields; omitted flags are left as they are.
    Profile {
        #[arg(long)]
        user_name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
    Verify(VerifyCommand),
    Password(PasswordCommand),
    Items(ItemsCommand),
    Bookings(BookingsCommand),
    Wishlist(WishlistCommand),
    Reviews(ReviewsCommand),
    /// Owned items with their active rental requests.
    Dashboard,
}

#[derive(Args, Debug)]
struct VerifyCommand {
    #[command(subcommand)]
    command: VerifySubcommand,
}

#[derive(Subcommand, Debug)]
enum VerifySubcommand {
    Send { email: String },
    Check { email: String },
    Confirm { uid: String, token: String },
}

#[derive(Args, Debug)]
struct PasswordCommand {
    #[command(subcommand)]
    command: PasswordSubcommand,
}

#[derive(Subcommand, Debug)]
enum PasswordSubcommand {
    Forgot {
        email: String,
    },
    Reset {
        uidb64: String,
        token: String,
        #[arg(long, env = "RENTIFY_NEW_PASSWORD", hide_env_values = true)]
        new_password: String,
    },
}

#[derive(Args, Debug)]
struct ItemsCommand {
    #[command(subcommand)]
    command: ItemsSubcommand,
}

#[derive(Subcommand, Debug)]
enum ItemsSubcommand {
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    Mine,
    Get {
        id: i64,
    },
    Create(ItemArgs),
    Update {
        id: i64,
        #[command(flatten)]
        item: ItemArgs,
    },
    Delete {
        id: i64,
    },
    Categories,
}

#[derive(Args, Debug)]
struct ItemArgs {
    #[arg(long)]
    title: String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long)]
    category: i64,
    #[arg(long)]
    price_per_day: String,
    #[arg(long)]
    condition: Option<String>,
    #[arg(long, default_value = "")]
    location: String,
    #[arg(long)]
    deposit: Option<String>,
    #[arg(long)]
    min_days: Option<u32>,
    #[arg(long)]
    max_days: Option<u32>,
}

#[derive(Args, Debug)]
struct BookingsCommand {
    #[command(subcommand)]
    command: BookingsSubcommand,
}

#[derive(Subcommand, Debug)]
enum BookingsSubcommand {
    List {
        #[arg(long)]
        item: Option<i64>,
    },
    Get {
        id: i64,
    },
    Create {
        item_id: i64,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long, default_value = "")]
        note: String,
        #[arg(long, default_value_t = false)]
        third_party: bool,
    },
    Accept {
        id: i64,
        #[arg(long, default_value = "")]
        note: String,
    },
    Confirm {
        id: i64,
    },
    Cancel {
        id: i64,
        #[arg(long, default_value = "")]
        note: String,
    },
    Return {
        id: i64,
        #[arg(long)]
        note: Option<String>,
    },
    Complete {
        id: i64,
    },
    Extend {
        id: i64,
        #[arg(long)]
        days: u32,
    },
    Logistics {
        id: i64,
        #[arg(long)]
        provider: String,
        #[arg(long, default_value = "")]
        details: String,
    },
    /// Tally bookings by status.
    Counts,
}

#[derive(Args, Debug)]
struct WishlistCommand {
    #[command(subcommand)]
    command: WishlistSubcommand,
}

#[derive(Subcommand, Debug)]
enum WishlistSubcommand {
    List,
    Add { item_id: i64 },
    Remove { entry_id: i64 },
}

#[derive(Args, Debug)]
struct ReviewsCommand {
    #[command(subcommand)]
    command: ReviewsSubcommand,
}

#[derive(Subcommand, Debug)]
enum ReviewsSubcommand {
    /// Completed rentals still awaiting a review.
    Pending,
    Mine,
    List {
        kind: String,
        subject: i64,
    },
    Create(ReviewArgs),
    Helpful {
        kind: String,
        review_id: i64,
    },
}

#[derive(Args, Debug)]
struct ReviewArgs {
    kind: String,
    booking: i64,
    /// Item id, or the owner's or renter's user id.
    subject: i64,
    #[arg(long)]
    rating: u8,
    /// Aspect rating as `name=value`, e.g. `value_rating=4`.
    #[arg(long = "aspect")]
    aspects: Vec<String>,
    #[arg(long, default_value = "")]
    title: String,
    #[arg(long, default_value = "")]
    comment: String,
    #[arg(long, default_value = "")]
    pros: String,
    #[arg(long, default_value = "")]
    cons: String,
    #[arg(long, default_value_t = false)]
    not_recommended: bool,
    #[arg(long)]
    damage: Option<String>,
    #[arg(long, default_value_t = false)]
    late: bool,
    #[arg(long, default_value_t = false)]
    dirty: bool,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let session = build_session(cli.base_url.as_deref(), cli.session_file)?;
    let result = run(&session, cli.command).await;
    if let Some(route) = session.take_redirect() {
        debug!(route = route.path(), "session redirect");
    }
    result
}

fn init_tracing(level: &str) {
    let max_level = level.parse::<LevelFilter>().unwrap_or(LevelFilter::WARN);
    tracing_subscriber::fmt().with_max_level(max_level).with_writer(std::io::stderr).init();
}

fn build_session(base_url: Option<&str>, session_file: Option<PathBuf>) -> Result<SessionManager, CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = base_url {
        config = config.with_base_url(base_url)?;
    }
    if let Some(path) = session_file {
        config = config.with_session_file(path);
    }

    let store = FileStore::open(&config.session_file)?;
    let transport = ReqwestTransport::new(config)?;
    Ok(SessionManager::new(Arc::new(transport), Arc::new(store)))
}

async fn run(session: &SessionManager, command: Command) -> Result<(), CliError> {
    match command {
        Command::Login { email, password } => {
            let login = auth::login(session, &email, &password).await?;
            print_json(&json!({ "email": login.email, "user_name": login.user_name, "user_id": login.user_id }))
        }
        Command::Logout => {
            session.logout().await?;
            print_json(&json!({ "logged_out": true }))
        }
        Command::Register { email, user_name, password } => {
            let request = RegisterRequest { email, user_name, password };
            print_json(&auth::register(session, &request).await?)
        }
        Command::Whoami => {
            let identity = session.identity();
            let user = auth::current_user(session).await?;
            print_json(&json!({ "cached": { "email": identity.email, "user_name": identity.user_name }, "user": user }))
        }
        Command::Profile { user_name, phone, address } => {
            print_json(&auth::update_profile(session, &ProfileUpdate { user_name, phone, address }).await?)
        }
        Command::Verify(verify) => run_verify(session, verify.command).await,
        Command::Password(password) => run_password(session, password.command).await,
        Command::Items(items) => run_items(session, items.command).await,
        Command::Bookings(bookings) => run_bookings(session, bookings.command).await,
        Command::Wishlist(wishlist) => run_wishlist(session, wishlist.command).await,
        Command::Reviews(reviews) => run_reviews(session, reviews.command).await,
        Command::Dashboard => {
            let dashboard = dashboard::load_rental_dashboard(session).await?;
            if let Some(warning) = &dashboard.warning {
                eprintln!("warning: {warning}");
            }
            print_json(&dashboard)
        }
    }
}

async fn run_verify(session: &SessionManager, command: VerifySubcommand) -> Result<(), CliError> {
    match command {
        VerifySubcommand::Send { email } => print_json(&auth::send_verification(session, &email).await?),
        VerifySubcommand::Check { email } => print_json(&auth::check_verification(session, &email).await?),
        VerifySubcommand::Confirm { uid, token } => print_json(&auth::verify_email(session, &uid, &token).await?),
    }
}

async fn run_password(session: &SessionManager, command: PasswordSubcommand) -> Result<(), CliError> {
    match command {
        PasswordSubcommand::Forgot { email } => print_json(&auth::forgot_password(session, &email).await?),
        PasswordSubcommand::Reset { uidb64, token, new_password } => {
            print_json(&auth::reset_password(session, &uidb64, &token, &new_password).await?)
        }
    }
}

async fn run_items(session: &SessionManager, command: ItemsSubcommand) -> Result<(), CliError> {
    match command {
        ItemsSubcommand::List { search, category } => {
            print_json(&items::list_items(session, &ItemQuery { search, category }).await?)
        }
        ItemsSubcommand::Mine => print_json(&items::my_items(session).await?),
        ItemsSubcommand::Get { id } => print_json(&items::get_item(session, id).await?),
        ItemsSubcommand::Create(args) => print_json(&items::create_item(session, &item_draft(args)?).await?),
        ItemsSubcommand::Update { id, item } => {
            print_json(&items::update_item(session, id, &item_draft(item)?).await?)
        }
        ItemsSubcommand::Delete { id } => {
            items::delete_item(session, id).await?;
            print_json(&json!({ "deleted": id }))
        }
        ItemsSubcommand::Categories => print_json(&items::categories(session).await?),
    }
}

async fn run_bookings(session: &SessionManager, command: BookingsSubcommand) -> Result<(), CliError> {
    let (id, action) = match command {
        BookingsSubcommand::List { item: Some(item_id) } => {
            return print_json(&bookings::bookings_for_item(session, item_id).await?);
        }
        BookingsSubcommand::List { item: None } => return print_json(&bookings::list_bookings(session).await?),
        BookingsSubcommand::Get { id } => return print_json(&bookings::get_booking(session, id).await?),
        BookingsSubcommand::Counts => {
            let all = bookings::list_bookings(session).await?;
            return print_json(&dashboard::status_counts(&all));
        }
        BookingsSubcommand::Create { item_id, start, end, note, third_party } => {
            let draft =
                BookingDraft { item_id, start_date: start, end_date: end, renter_note: note, third_party_required: third_party };
            return print_json(&bookings::create_booking(session, &draft).await?);
        }
        BookingsSubcommand::Accept { id, note } => (id, BookingAction::OwnerAccept { note }),
        BookingsSubcommand::Confirm { id } => (id, BookingAction::RenterConfirm),
        BookingsSubcommand::Cancel { id, note } => (id, BookingAction::Cancel { note }),
        BookingsSubcommand::Return { id, note } => (id, BookingAction::Return { note }),
        BookingsSubcommand::Complete { id } => (id, BookingAction::Complete),
        BookingsSubcommand::Extend { id, days } => (id, BookingAction::Extend { days }),
        BookingsSubcommand::Logistics { id, provider, details } => {
            (id, BookingAction::AssignLogistics { provider, details })
        }
    };
    print_json(&bookings::apply_action(session, id, &action).await?)
}

async fn run_wishlist(session: &SessionManager, command: WishlistSubcommand) -> Result<(), CliError> {
    match command {
        WishlistSubcommand::List => print_json(&wishlist::list_wishlist(session).await?),
        WishlistSubcommand::Add { item_id } => print_json(&wishlist::add_to_wishlist(session, item_id).await?),
        WishlistSubcommand::Remove { entry_id } => {
            wishlist::remove_from_wishlist(session, entry_id).await?;
            print_json(&json!({ "removed": entry_id }))
        }
    }
}

async fn run_reviews(session: &SessionManager, command: ReviewsSubcommand) -> Result<(), CliError> {
    match command {
        ReviewsSubcommand::Pending => print_json(&reviews::pending_reviews(session).await?),
        ReviewsSubcommand::Mine => print_json(&reviews::my_reviews(session).await?),
        ReviewsSubcommand::List { kind, subject } => {
            print_json(&reviews::list_reviews(session, parse_review_kind(&kind)?, subject).await?)
        }
        ReviewsSubcommand::Create(args) => {
            print_json(&reviews::create_review(session, &review_draft(args)?).await?)
        }
        ReviewsSubcommand::Helpful { kind, review_id } => {
            print_json(&reviews::toggle_helpful(session, parse_review_kind(&kind)?, review_id).await?)
        }
    }
}

fn review_draft(args: ReviewArgs) -> Result<ReviewDraft, CliError> {
    let mut draft = ReviewDraft::new(parse_review_kind(&args.kind)?, args.booking, args.subject, args.rating);
    for aspect in &args.aspects {
        let (name, value) = aspect.split_once('=').ok_or_else(|| CliError::InvalidAspect(aspect.clone()))?;
        let value = value.trim().parse::<u8>().map_err(|_| CliError::InvalidAspect(aspect.clone()))?;
        draft.sub_ratings.insert(name.trim().to_owned(), value);
    }
    draft.title = args.title;
    draft.comment = args.comment;
    draft.pros = args.pros;
    draft.cons = args.cons;
    draft.recommend = !args.not_recommended;
    draft.return_report = ReturnReport {
        returned_clean: !args.dirty,
        returned_on_time: !args.late,
        any_damage: args.damage.is_some(),
        damage_description: args.damage.unwrap_or_default(),
    };
    Ok(draft)
}

fn parse_review_kind(raw: &str) -> Result<ReviewKind, CliError> {
    serde_json::from_value(serde_json::Value::String(raw.to_owned()))
        .map_err(|_| CliError::InvalidReviewKind(raw.to_owned()))
}

fn item_draft(args: ItemArgs) -> Result<ItemDraft, CliError> {
    let condition = args.condition.as_deref().map(parse_condition).transpose()?;
    Ok(ItemDraft {
        title: args.title,
        description: args.description,
        category: args.category,
        price_per_day: args.price_per_day,
        condition,
        location: args.location,
        deposit_required: args.deposit,
        minimum_rental_days: args.min_days,
        maximum_rental_days: args.max_days,
    })
}

fn parse_condition(raw: &str) -> Result<Condition, CliError> {
    match serde_json::from_value::<Condition>(serde_json::Value::String(raw.to_owned())) {
        Ok(Condition::Other) | Err(_) => Err(CliError::InvalidCondition(raw.to_owned())),
        Ok(condition) => Ok(condition),
    }
}

fn print_json(value: &impl Serialize) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
