use std::process;

use clap::Parser;
use core_guard::{BcryptPasswordEncoder, PasswordEncoder};

/// Generate a bcrypt hash for the given password.
///
/// The output can be inserted into the `users.password_hash` column directly.
#[derive(Parser)]
#[command(name = "generate-password-hash")]
struct Cli {
    /// The password to hash.
    password: String,
    /// bcrypt cost factor (4-31). Should match BCRYPT_COST of the server.
    #[arg(short, long, default_value_t = 10)]
    cost: u32,
}

fn main() {
    let cli = Cli::parse();

    let encoder = match BcryptPasswordEncoder::new(cli.cost) {
        Ok(encoder) => encoder,
        Err(e) => {
            eprintln!("Invalid cost: {}", e);
            process::exit(1);
        }
    };

    match encoder.hash(&cli.password) {
        Ok(hashed) => println!("{}", hashed),
        Err(e) => {
            eprintln!("Error generating hash: {}", e);
            process::exit(1);
        }
    }
}
