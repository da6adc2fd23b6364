use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use booking_client::{
    config::Config,
    controllers::{
        AccountController, BookingSessionController, CatalogController, MovieSection,
        MyBookingsController, Navigation, SeatRoute,
    },
    models::{SeatId, ShowtimeId},
    reconciler::{RenderStatus, SeatMapView},
    ClientContext,
};

#[derive(Parser)]
#[command(name = "booking", about = "Movie ticket booking client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List movies
    Movies {
        #[arg(long)]
        upcoming: bool,
        #[arg(long)]
        now_showing: bool,
        #[arg(long)]
        top_rated: Option<f64>,
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// List showtimes of a movie
    Showtimes { movie_id: i64 },
    /// Show the seat map of a showtime
    Seats {
        showtime_id: ShowtimeId,
        /// Keep printing live seat updates until Ctrl-C
        #[arg(long)]
        watch: bool,
    },
    /// Book seats
    Book { showtime_id: ShowtimeId, seat_ids: Vec<SeatId> },
    /// List my bookings
    Bookings,
    /// Replace the seats of a booking; no seats cancels it
    Edit {
        booking_id: i64,
        seat_ids: Vec<SeatId>,
        #[arg(long)]
        yes: bool,
    },
    /// Cancel a booking
    Cancel { booking_id: i64 },
    /// Log in and print the access token
    Login { email: String, password: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("failed to load configuration")?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.app.rust_log))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    info!("Booking client ({}) using {}", config.app.environment, config.api.base_url);

    let cli = Cli::parse();
    let ctx = ClientContext::new(config).context("failed to build HTTP client")?;

    match cli.command {
        Command::Movies { upcoming, now_showing, top_rated, search, page } => {
            let section = match (upcoming, now_showing, top_rated) {
                (true, _, _) => MovieSection::Upcoming,
                (_, true, _) => MovieSection::NowShowing,
                (_, _, Some(min_rating)) => MovieSection::TopRated { min_rating: Some(min_rating) },
                _ => MovieSection::All,
            };
            let catalog = CatalogController::new(ctx.backend.clone());
            let result = catalog.browse(section, &search, page).await?;
            for movie in &result.movies {
                println!(
                    "{:>5}  {}  {}",
                    movie.id,
                    movie.title,
                    movie.rating.map(|r| format!("★ {:.1}", r)).unwrap_or_default()
                );
            }
            println!("page {}/{} ({} movies)", result.page, result.total_pages, result.total_matches);
        }
        Command::Showtimes { movie_id } => {
            let catalog = CatalogController::new(ctx.backend.clone());
            let showtimes = catalog.showtimes(movie_id).await?;
            if showtimes.is_empty() {
                println!("No showtimes available for this movie.");
            }
            for st in showtimes {
                println!(
                    "{:>5}  {}  {}  {}",
                    st.id,
                    st.start_time.format("%a %d %b %H:%M"),
                    st.hall_name(),
                    st.location.as_deref().unwrap_or("Location not available")
                );
            }
        }
        Command::Seats { showtime_id, watch } => {
            let session = BookingSessionController::start(&ctx, SeatRoute::create(showtime_id)).await?;
            print_seat_map(&session.view());
            if watch {
                let mut updates = session.reconciler().watch();
                loop {
                    tokio::select! {
                        changed = updates.changed() => {
                            if changed.is_err() {
                                break;
                            }
                            print_seat_map(&updates.borrow_and_update());
                        }
                        _ = tokio::signal::ctrl_c() => break,
                    }
                }
            }
            session.close();
        }
        Command::Book { showtime_id, seat_ids } => {
            let mut session = BookingSessionController::start(&ctx, SeatRoute::create(showtime_id)).await?;
            let refused = session.select_exactly(&seat_ids)?;
            if !refused.is_empty() {
                bail!("seats could not be set as requested: {:?}", refused);
            }
            print_seat_map(&session.view());
            report(session.submit(|| false).await?);
        }
        Command::Bookings => {
            let mut bookings = MyBookingsController::new(ctx.backend.clone(), ctx.auth.clone());
            for b in bookings.load().await? {
                println!(
                    "#{:<5} {:<30} {}  seats: {}  total: ₹{}  {:?}",
                    b.id,
                    b.movie_title.as_deref().unwrap_or("Unknown Movie"),
                    b.showtime.map(|t| t.format("%Y-%m-%d %H:%M").to_string()).unwrap_or_default(),
                    b.seat_labels().join(", "),
                    b.total_amount,
                    b.status
                );
            }
        }
        Command::Edit { booking_id, seat_ids, yes } => {
            let bookings = MyBookingsController::new(ctx.backend.clone(), ctx.auth.clone());
            let booking = bookings.booking(booking_id).await?;
            let mut session = BookingSessionController::start(&ctx, SeatRoute::edit(booking)?).await?;
            let refused = session.select_exactly(&seat_ids)?;
            if !refused.is_empty() {
                bail!("seats could not be set as requested: {:?}", refused);
            }
            let outcome = session
                .submit(|| yes || confirm("Are you sure you want to cancel this booking?"))
                .await?;
            report(outcome);
        }
        Command::Cancel { booking_id } => {
            let mut bookings = MyBookingsController::new(ctx.backend.clone(), ctx.auth.clone());
            bookings.load().await?;
            bookings.cancel(booking_id).await?;
            println!("Booking cancelled successfully!");
        }
        Command::Login { email, password } => {
            let account = AccountController::new(ctx.backend.clone(), ctx.auth.clone());
            account.login(&email, &password).await?;
            match account.token() {
                Some(token) => println!("{}", token),
                None => bail!("received token is not usable"),
            }
        }
    }

    Ok(())
}

fn report(outcome: Option<Navigation>) {
    match outcome {
        Some(Navigation::BookingConfirmation(c)) => {
            println!("Booking Confirmed #{}", c.booking_id);
            println!("  Movie:    {} ({})", c.movie, c.hall);
            if let Some(showtime) = c.showtime {
                println!("  Showtime: {}", showtime.format("%Y-%m-%d %H:%M"));
            }
            println!("  Seats:    {}", c.seats.join(", "));
            println!("  Total:    ₹{}", c.total_amount);
        }
        Some(Navigation::MyBookings { notice }) => println!("{}", notice),
        None => println!("Nothing changed."),
    }
}

fn confirm(question: &str) -> bool {
    print!("{} [y/N] ", question);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer).is_ok() && answer.trim().eq_ignore_ascii_case("y")
}

fn print_seat_map(view: &SeatMapView) {
    println!("            [ SCREEN ]");
    for row in &view.rows {
        let cells: Vec<String> = row
            .seats
            .iter()
            .map(|s| {
                let mark = match s.status {
                    RenderStatus::Available => ' ',
                    RenderStatus::Selected => '*',
                    RenderStatus::Booked => 'x',
                    RenderStatus::Locked => '~',
                };
                format!("{}[{:>3}]", mark, s.label)
            })
            .collect();
        println!("{:>3} {}", row.row, cells.join(""));
    }
    if !view.current_booking.is_empty() {
        println!("Current booking: {}", view.current_booking.join(", "));
    }
    if view.selected_labels.is_empty() {
        println!("No seats selected");
    } else {
        println!("Selected: {}", view.selected_labels.join(", "));
    }
    println!("₹{}   [{}]", view.total_price, view.action.label());
}
