//! EventPass demo client.
//!
//! Walks through a customer session (sign in, browse, favorite, book) and,
//! when the backend allows it, an administrator session, printing the
//! rendered markup of each view.
//!
//! ```text
//! eventpass [username] [password]
//! ```

use chrono::{Days, Utc};
use eventpass_client::router::{AdminTab, CustomerTab, Route};
use eventpass_client::state::FormKind;
use eventpass_client::types::{Event, EventDraft, EventId, Role};
use eventpass_client::{
    Backend, BookingApi, ClientConfig, EventPassClient, HttpTransport, InMemoryBookingApi,
    Submission, ViewKind,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn seeded_backend() -> InMemoryBookingApi {
    let today = Utc::now().date_naive();
    let seed = |id: &str, title: &str, location: &str, days: u64, total: i64, booked: i64| Event {
        event_id: EventId::new(id),
        event_title: title.to_string(),
        event_description: format!("{title} at {location}"),
        event_location: location.to_string(),
        event_date: (today + Days::new(days)).format("%Y-%m-%d").to_string(),
        event_start_time: "18:00".to_string(),
        event_end_time: "21:00".to_string(),
        total_slots: total,
        booked_slots: booked,
        created_by: Some("admin".to_string()),
    };

    InMemoryBookingApi::new()
        .with_user("admin", "admin")
        .with_user("demo", "demo")
        .with_event(seed("jazz-night", "Jazz Night", "Blue Room", 7, 80, 80))
        .with_event(seed("rust-meetup", "Rust Meetup", "Hall B", 14, 40, 12))
        .with_event(seed("open-air", "Open Air Cinema", "City Park", 21, 200, 57))
}

async fn print_view(client: &EventPassClient, kind: ViewKind) -> Result<(), Box<dyn std::error::Error>> {
    println!("<!-- {kind:?} -->");
    println!("{}", client.render_html(kind).await?);
    Ok(())
}

async fn print_current_view(client: &EventPassClient) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(kind) = client.current_view().await {
        print_view(client, kind).await?;
    }
    Ok(())
}

async fn customer_walkthrough(
    client: &EventPassClient,
    username: &str,
    password: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    client.select_user_type(Role::Customer).await?;
    match client.submit_login(username, password).await? {
        Submission::Completed => info!(username, "Signed in"),
        Submission::Failed(message) => {
            warn!(%message, "Sign-in failed");
            return Ok(());
        },
        Submission::Ignored => return Ok(()),
    }
    print_view(client, ViewKind::CustomerEvents).await?;

    let snapshot = client.snapshot().await;
    let Some(open) = snapshot.events.iter().find(|e| !e.is_sold_out()) else {
        warn!("Nothing left to book");
        return Ok(());
    };

    client.toggle_favorite(&open.event_id).await?;
    if let Submission::Failed(message) = client.book(&open.event_id).await? {
        warn!(%message, "Booking failed");
    }

    client.navigate(Route::Customer(CustomerTab::Bookings)).await?;
    print_current_view(client).await?;
    print_view(client, ViewKind::Favorites).await?;

    client.logout().await?;
    Ok(())
}

async fn admin_walkthrough(client: &EventPassClient) -> Result<(), Box<dyn std::error::Error>> {
    client.select_user_type(Role::Admin).await?;
    if client.submit_login("admin", "admin").await? != Submission::Completed {
        warn!("Admin sign-in failed, skipping admin walkthrough");
        return Ok(());
    }

    client.navigate(Route::Admin(AdminTab::CreateEvent)).await?;
    let draft = EventDraft {
        title: "Winter Gala".to_string(),
        description: "Black tie".to_string(),
        location: "Grand Hotel".to_string(),
        date: (Utc::now().date_naive() + Days::new(30)).format("%Y-%m-%d").to_string(),
        start_time: "19:00".to_string(),
        end_time: "23:30".to_string(),
        total_slots: 150,
    };
    if let Submission::Failed(message) = client.submit_event(draft).await? {
        warn!(%message, "Event creation failed");
    }
    println!("{}", client.render_form_html(FormKind::CreateEvent).await?);

    client.navigate(Route::Admin(AdminTab::Analytics)).await?;
    print_view(client, ViewKind::AdminEvents).await?;
    print_current_view(client).await?;

    client.logout().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eventpass=info,eventpass_client=info,eventpass_runtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ClientConfig::from_env()?;
    info!(
        api_base_url = %config.api_base_url,
        booking_mode = %config.booking_mode,
        backend = ?config.backend,
        "Configuration loaded"
    );

    let mut args = std::env::args().skip(1);
    let username = args.next().unwrap_or_else(|| "demo".to_string());
    let password = args.next().unwrap_or_else(|| "demo".to_string());

    let client = match config.backend {
        Backend::Http => {
            let transport = HttpTransport::new(config.api_base_url.clone());
            let loading = transport.loading();
            let api: Arc<dyn BookingApi> = Arc::new(transport);
            EventPassClient::new(api, &config).with_loading_indicator(loading)
        },
        Backend::InMemory => EventPassClient::new(Arc::new(seeded_backend()), &config),
    };

    customer_walkthrough(&client, &username, &password).await?;
    admin_walkthrough(&client).await?;

    client.shutdown().await?;
    info!("Walkthrough complete");
    Ok(())
}
