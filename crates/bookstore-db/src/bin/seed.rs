//! # Seed Data Generator
//!
//! Populates the catalog with sample books for development.
//!
//! ## Usage
//! ```bash
//! # Generate 500 books (default)
//! cargo run -p bookstore-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p bookstore-db --bin seed -- --count 2000
//!
//! # Specify database path
//! cargo run -p bookstore-db --bin seed -- --db ./data/bookstore.db
//! ```
//!
//! Each book gets:
//! - ISBN `978` + zero-padded index
//! - A title built from the word lists below
//! - Random retail price 9.90 - 129.90, or none for one book in ten
//! - Random stock 0 - 50

use rand::Rng;
use std::env;

use bookstore_core::NewBook;
use bookstore_db::{Database, DbConfig};

const ADJECTIVES: &[&str] = &[
    "Practical", "Hidden", "Modern", "Silent", "Complete", "Forgotten", "Essential", "Distant",
    "Concise", "Restless",
];

const SUBJECTS: &[&str] = &[
    "Systems", "Gardens", "Algorithms", "Rivers", "Compilers", "Empires", "Networks", "Oceans",
    "Databases", "Cities",
];

const AUTHORS: &[&str] = &[
    "A. Lin", "M. Okafor", "J. Novak", "S. Haddad", "R. Tanaka", "L. Moreau", "K. Singh",
];

const PUBLISHERS: &[&str] = &["Harbor Press", "North Field Books", "Lantern House"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 500;
    let mut db_path = String::from("./bookstore_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(500);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Bookstore Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of books to generate (default: 500)");
                println!("  -d, --db <PATH>    Database file path (default: ./bookstore_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Bookstore Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!("Books:    {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    let existing = db.books().count().await?;
    if existing > 0 {
        println!("⚠ Catalog already has {} books, skipping seed", existing);
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let mut rng = rand::thread_rng();
    let start = std::time::Instant::now();
    let mut generated = 0;

    for index in 0..count {
        let book = generate_book(&mut rng, index);

        if let Err(e) = db.books().create(&book).await {
            eprintln!("Failed to insert {}: {}", book.isbn, e);
            continue;
        }

        generated += 1;
        if generated % 100 == 0 {
            println!("  Generated {} books...", generated);
        }
    }

    println!();
    println!("✓ Generated {} books in {:?}", generated, start.elapsed());

    Ok(())
}

fn generate_book(rng: &mut impl Rng, index: usize) -> NewBook {
    let title = format!(
        "{} {}",
        ADJECTIVES[index % ADJECTIVES.len()],
        SUBJECTS[(index / ADJECTIVES.len()) % SUBJECTS.len()]
    );
    let title = match index / (ADJECTIVES.len() * SUBJECTS.len()) {
        0 => title,
        volume => format!("{title}, Vol. {}", volume + 1),
    };

    // Prices end in 90 cents
    let retail_price_cents = (!rng.gen_ratio(1, 10)).then(|| rng.gen_range(1..=13) * 1000 - 10);

    NewBook {
        isbn: format!("978{:010}", index),
        title,
        author: Some(AUTHORS[rng.gen_range(0..AUTHORS.len())].to_string()),
        publisher: Some(PUBLISHERS[index % PUBLISHERS.len()].to_string()),
        retail_price_cents,
        stock: rng.gen_range(0..=50),
    }
}
