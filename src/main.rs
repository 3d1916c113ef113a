use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rentdesk::config::ClientConfig;
use rentdesk::error::{AppError, AppResult};
use rentdesk::forms::{
    FieldValue, FormController, FormModel, PropertyField, PropertyFormData, RentalField,
    RentalFormData,
};
use rentdesk::repository::{ApiClient, Attachment};
use rentdesk::routes::{guard, navigation_for, Route};
use rentdesk::schemas::{CreateScheduleInput, LoginInput, Payment, RecordPaymentInput};
use rentdesk::services::formatting::{format_amount, format_percent};
use rentdesk::services::payments::{tenant_overview, today_in, PaymentFilter};
use rentdesk::services::selectors::PaymentBook;
use rentdesk::services::{auth, documents, schedules};
use rentdesk::session::{FileTokenStore, Session};
use tracing_subscriber::EnvFilter;

/// Command-line dashboard for owners and tenants.
#[derive(Parser, Debug)]
#[command(name = "rentdesk")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and store the access token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "RENTDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored access token
    Logout,
    /// Show the signed-in user and their navigation
    Whoami,
    /// List payments
    Payments(FilterArgs),
    /// Dashboard statistics for the current month
    Stats,
    /// Accounting totals over the filtered payments
    Accounting(FilterArgs),
    /// Payments of the signed-in tenant
    MyPayments,
    /// List payment schedules
    Schedules,
    #[command(subcommand)]
    Schedule(ScheduleCommand),
    /// Record a received payment
    RecordPayment {
        payment_id: String,
        #[arg(long)]
        amount: f64,
        #[arg(long)]
        method: String,
        #[arg(long)]
        transaction_id: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Archive a payment
    Archive { payment_id: String },
    /// Download the receipt of a payment
    Receipt {
        payment_id: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Download the lease document of a rental
    Lease {
        rental_id: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List generated documents
    Documents,
    /// List properties
    Properties,
    /// List rentals
    Rentals,
    /// List tenants
    Tenants,
    #[command(subcommand)]
    Property(PropertyCommand),
    #[command(subcommand)]
    Rental(RentalCommand),
}

#[derive(Args, Debug)]
struct FilterArgs {
    #[arg(long, default_value = "all")]
    status: String,
    #[arg(long, default_value = "all")]
    tenant: String,
    #[arg(long, default_value = "all")]
    property: String,
    #[arg(long)]
    from: Option<NaiveDate>,
    #[arg(long)]
    to: Option<NaiveDate>,
    #[arg(long, default_value_t = false)]
    archived: bool,
}

impl FilterArgs {
    fn filter(&self) -> PaymentFilter {
        PaymentFilter::from_params(
            &self.status,
            &self.tenant,
            &self.property,
            self.from,
            self.to,
            self.archived,
        )
    }
}

#[derive(Subcommand, Debug)]
enum ScheduleCommand {
    /// Create a monthly payment schedule
    Create {
        #[arg(long)]
        property: String,
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        #[arg(long)]
        amount: f64,
        #[arg(long)]
        day: u8,
    },
}

#[derive(Subcommand, Debug)]
enum PropertyCommand {
    /// Create a property from `field=value` pairs
    Create {
        fields: Vec<String>,
        /// Image to upload with the property, repeatable
        #[arg(long = "image")]
        images: Vec<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum RentalCommand {
    /// Create a rental from `field=value` pairs
    Create { fields: Vec<String> },
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::debug!(error = %error, "Command failed");
            eprintln!("{}", error.user_message());
            if let AppError::Validation(errors) = &error {
                for (field, message) in errors.iter() {
                    eprintln!("  {field}: {message}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    let config = Arc::new(ClientConfig::from_env());
    let session = Arc::new(Session::new(Arc::new(FileTokenStore::new(
        config.session_file.clone(),
    )))?);
    let client = ApiClient::new(config.clone(), session.clone())?;

    let outcome = dispatch(&client, cli.command).await;
    if let Some(redirect) = session.take_redirect() {
        tracing::debug!(
            to = redirect.to.path(),
            after_ms = redirect.after.as_millis() as u64,
            "Redirect"
        );
        if redirect.to == Route::Login && outcome.is_err() {
            eprintln!("Please sign in with `rentdesk login`.");
        }
    }
    outcome
}

async fn dispatch(client: &ApiClient, command: Command) -> AppResult<()> {
    let config = client.config();
    match command {
        Command::Login { email, password } => {
            let user = auth::login(client, &LoginInput { email, password }).await?;
            println!("Signed in as {} ({})", user.display_name(), user.role.as_str());
        }
        Command::Logout => {
            auth::logout(client)?;
            println!("Signed out.");
        }
        Command::Whoami => {
            allow(client, Route::Dashboard)?;
            let user = auth::me(client).await?;
            println!("{} <{}> {}", user.display_name(), user.email, user.role.as_str());
            for route in navigation_for(user.role) {
                println!("  {:<24} {}", route.path(), route.title());
            }
        }
        Command::Payments(args) => {
            allow(client, Route::Payments)?;
            let book = PaymentBook::new(schedules::list_payments(client).await?);
            for payment in book.filtered(&args.filter()).iter() {
                print_payment(payment, &config.currency);
            }
        }
        Command::Stats => {
            allow(client, Route::Dashboard)?;
            let book = PaymentBook::new(schedules::list_payments(client).await?);
            let stats = book.statistics(today_in(config.timezone));
            println!("Revenue          {}", format_amount(stats.total_revenue, &config.currency));
            println!("Payment rate     {}", format_percent(stats.payment_rate));
            println!("Late             {}", format_amount(stats.late_payments, &config.currency));
            println!("Pending          {}", format_amount(stats.pending_payments, &config.currency));
        }
        Command::Accounting(args) => {
            allow(client, Route::Accounting)?;
            let book = PaymentBook::new(schedules::list_payments(client).await?);
            let summary = book.accounting(&args.filter());
            let currency = config.currency.as_str();
            println!("Paid             {:>4}  {}", summary.paid.count, format_amount(summary.paid.amount, currency));
            println!("Pending          {:>4}  {}", summary.pending.count, format_amount(summary.pending.amount, currency));
            println!("Late             {:>4}  {}", summary.late.count, format_amount(summary.late.amount, currency));
            println!("Collected              {}", format_amount(summary.collected, currency));
            println!("Outstanding            {}", format_amount(summary.outstanding, currency));
            println!("Collection rate        {}", format_percent(summary.collection_rate));
        }
        Command::MyPayments => {
            allow(client, Route::MyPayments)?;
            let tenant_id = client
                .session()
                .user_id()
                .ok_or_else(|| AppError::Unauthorized("Please sign in again.".to_string()))?;
            let payments = schedules::list_payments(client).await?;
            let overview = tenant_overview(&payments, &tenant_id);
            println!("Amount due       {}", format_amount(overview.amount_due, &config.currency));
            if let Some(next) = overview.next_due() {
                println!("Next due         {}", next.due_date);
            }
            for payment in overview.late.iter().chain(&overview.upcoming).chain(&overview.history) {
                print_payment(payment, &config.currency);
            }
        }
        Command::Schedules => {
            allow(client, Route::Schedules)?;
            let page = schedules::load_schedules_page(client).await?;
            for schedule in &page.schedules {
                println!(
                    "{}  {} → {}  day {:>2}  {}  {}  {}",
                    schedule.id,
                    schedule.start_date,
                    schedule.end_date,
                    schedule.day_of_month,
                    format_amount(schedule.monthly_amount, &config.currency),
                    schedule.property.label(),
                    schedule.tenant.display_name(),
                );
            }
            println!(
                "{} schedules, {} properties, {} tenants",
                page.schedules.len(),
                page.properties.len(),
                page.tenants.len()
            );
        }
        Command::Schedule(ScheduleCommand::Create {
            property,
            tenant,
            start,
            end,
            amount,
            day,
        }) => {
            allow(client, Route::Schedules)?;
            let input = CreateScheduleInput {
                start_date: start,
                end_date: end,
                monthly_amount: amount,
                day_of_month: day,
                property_id: property,
                tenant_id: tenant,
            };
            let schedule = schedules::create_schedule(client, &input).await?;
            println!("Created schedule {}", schedule.id);
        }
        Command::RecordPayment {
            payment_id,
            amount,
            method,
            transaction_id,
            notes,
        } => {
            allow(client, Route::Payments)?;
            let input = RecordPaymentInput {
                amount,
                payment_method: method,
                transaction_id,
                notes,
            };
            let payment = schedules::record_payment(client, &payment_id, &input).await?;
            println!("Payment {} is now {}", payment.id, payment.status.as_str());
        }
        Command::Archive { payment_id } => {
            allow(client, Route::Payments)?;
            let payment = schedules::archive_payment(client, &payment_id).await?;
            println!("Archived payment {}", payment.id);
        }
        Command::Receipt { payment_id, out } => {
            allow(client, Route::Dashboard)?;
            let dir = out.unwrap_or_else(|| config.download_dir.clone());
            let path = documents::download_receipt(client, &payment_id, &dir).await?;
            println!("Saved {}", path.display());
        }
        Command::Lease { rental_id, out } => {
            allow(client, Route::Dashboard)?;
            let dir = out.unwrap_or_else(|| config.download_dir.clone());
            let path = documents::download_lease(client, &rental_id, &dir).await?;
            println!("Saved {}", path.display());
        }
        Command::Documents => {
            allow(client, Route::Dashboard)?;
            for document in documents::list_documents(client).await? {
                let created = document
                    .created_at
                    .map(|at| at.with_timezone(&config.timezone).format("%Y-%m-%d").to_string())
                    .unwrap_or_default();
                println!("{}  {:?}  {}  {}", document.id, document.kind, created, document.file_name);
            }
        }
        Command::Properties => {
            allow(client, Route::Properties)?;
            for property in schedules::list_properties(client).await? {
                println!(
                    "{}  {}  {}",
                    property.id,
                    property.name.as_deref().unwrap_or("-"),
                    property.city.as_deref().unwrap_or("-"),
                );
            }
        }
        Command::Rentals => {
            allow(client, Route::Rentals)?;
            for rental in schedules::list_rentals(client).await? {
                let period = match (rental.start_date, rental.end_date) {
                    (Some(start), Some(end)) => format!("{start} → {end}"),
                    (Some(start), None) => format!("from {start}"),
                    _ => "-".to_string(),
                };
                println!(
                    "{}  {}  {}  {}  {}",
                    rental.id,
                    rental.property.as_ref().map(|property| property.label()).unwrap_or_default(),
                    rental.tenant.as_ref().map(|tenant| tenant.display_name()).unwrap_or_default(),
                    period,
                    format_amount(rental.rent_amount.unwrap_or(0.0), &config.currency),
                );
            }
        }
        Command::Tenants => {
            allow(client, Route::Tenants)?;
            for tenant in schedules::list_tenants(client).await? {
                println!("{}  {}  <{}>", tenant.id, tenant.display_name(), tenant.email);
            }
        }
        Command::Property(PropertyCommand::Create { fields, images }) => {
            allow(client, Route::NewProperty)?;
            let mut form = FormController::<PropertyFormData>::new();
            for (key, value) in parse_pairs(&fields)? {
                let field = PropertyField::from_key(&key)
                    .ok_or_else(|| AppError::BadRequest(format!("Unknown property field '{key}'.")))?;
                form.handle_change(field, FieldValue::text(value));
            }
            for path in &images {
                form.add_attachment(Attachment::image_from_path(path).await?);
            }
            let property = submit(&mut form, client).await?;
            println!("Created property {}", property.id);
        }
        Command::Rental(RentalCommand::Create { fields }) => {
            allow(client, Route::NewRental)?;
            let mut form = FormController::<RentalFormData>::new();
            for (key, value) in parse_pairs(&fields)? {
                let field = RentalField::from_key(&key)
                    .ok_or_else(|| AppError::BadRequest(format!("Unknown rental field '{key}'.")))?;
                form.handle_change(field, FieldValue::text(value));
            }
            let rental = submit(&mut form, client).await?;
            println!("Created rental {}", rental.id);
        }
    }
    Ok(())
}

async fn submit<M>(form: &mut FormController<M>, client: &ApiClient) -> AppResult<M::Created>
where
    M: FormModel,
    M::Created: Clone,
{
    let outcome = form.submit(client).await.cloned();
    match outcome {
        Ok(created) => Ok(created),
        Err(error) if !form.field_errors().is_empty() => {
            tracing::debug!(error = %error, "Form rejected locally");
            Err(AppError::Validation(form.field_errors().clone()))
        }
        Err(error) => Err(error),
    }
}

fn allow(client: &ApiClient, route: Route) -> AppResult<()> {
    match guard(route, client.session()) {
        Ok(_) => Ok(()),
        Err(redirect) if redirect.to == Route::Login => {
            Err(AppError::Unauthorized("Please sign in with `rentdesk login`.".to_string()))
        }
        Err(_) => Err(AppError::Forbidden(format!(
            "{} is not available for your account.",
            route.title()
        ))),
    }
}

fn parse_pairs(raw: &[String]) -> AppResult<Vec<(String, String)>> {
    raw.iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(key, value)| (key.trim().to_string(), value.to_string()))
                .ok_or_else(|| AppError::BadRequest(format!("Expected field=value, got '{pair}'.")))
        })
        .collect()
}

fn print_payment(payment: &Payment, currency: &str) {
    println!(
        "{}  {}  {:<7}  {:>14}  {}  {}",
        payment.id,
        payment.due_date,
        payment.status.as_str(),
        format_amount(payment.amount, currency),
        payment.payment_schedule.property.label(),
        payment.payment_schedule.tenant.display_name(),
    );
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,rentdesk=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
