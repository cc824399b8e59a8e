//! Registers a principal and prints its freshly generated bearer secret.
//! The secret is shown exactly once; only its hash is stored.

use rand::RngCore;

use ingest::hash_secret;
use tokenboard_db::Db;

fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    let hex: String = bytes.iter().map(|byte| format!("{:02x}", byte)).collect();
    format!("tb_live_{hex}")
}

fn main() {
    let mut args = std::env::args().skip(1);
    let Some(handle) = args.next() else {
        eprintln!("usage: issue-key <handle>");
        std::process::exit(2);
    };

    let db_path =
        std::env::var("TOKENBOARD_DB").unwrap_or_else(|_| "tokenboard.sqlite".to_string());
    let mut db = match Db::open(&db_path) {
        Ok(db) => db,
        Err(err) => {
            eprintln!("failed to open database: {}", err);
            std::process::exit(1);
        }
    };
    if let Err(err) = db.migrate() {
        eprintln!("failed to migrate database: {}", err);
        std::process::exit(1);
    }

    let secret = generate_secret();
    match db.create_principal(&handle, &hash_secret(&secret)) {
        Ok(principal) => {
            println!("registered {} (id {})", principal.handle, principal.id);
            println!("secret: {}", secret);
        }
        Err(err) => {
            eprintln!("failed to register {}: {}", handle, err);
            std::process::exit(1);
        }
    }
}
