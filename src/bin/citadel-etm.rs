//! Citadel ETM CLI: operational tooling for encryption/decryption
//!
//! Usage:
//!   citadel-etm keygen --output <keyfile>
//!   citadel-etm encrypt --key <keyfile> [--input <file>] [--output <file>] [--raw] [--ctr]
//!   citadel-etm decrypt --key <keyfile> [--input <file>] [--output <file>] [--raw]
//!   citadel-etm legacy-decrypt --key <keyfile> [--input <file>] [--output <file>]
//!   citadel-etm inspect [--input <file>] [--raw]
//!   citadel-etm self-test

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use citadel_etm::{Crypto, Encoding, Key, Version};
use tracing_subscriber::EnvFilter;

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    let result = match args[1].as_str() {
        "keygen" => cmd_keygen(&args[2..]),
        "encrypt" => cmd_encrypt(&args[2..]),
        "decrypt" => cmd_decrypt(&args[2..]),
        "legacy-decrypt" => cmd_legacy_decrypt(&args[2..]),
        "inspect" => cmd_inspect(&args[2..]),
        "self-test" => cmd_self_test(),
        "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        "--version" | "-V" => {
            println!("citadel-etm {}", citadel_etm::VERSION);
            Ok(())
        }
        cmd => {
            eprintln!("error: unknown command '{}'", cmd);
            print_usage();
            Err("unknown command".into())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    eprintln!(
        r#"Citadel ETM: versioned encrypt-then-MAC

USAGE:
    citadel-etm <COMMAND> [OPTIONS]

COMMANDS:
    keygen          Generate a new master key (hex)
    encrypt         Encrypt a file
    decrypt         Decrypt a file
    legacy-decrypt  Decrypt a pre-versioning (binary) ciphertext
    inspect         Show ciphertext metadata (no decryption)
    self-test       Run the known-answer self-test

EXAMPLES:
    # Generate key
    citadel-etm keygen --output master.key

    # Encrypt (hex output unless --raw)
    citadel-etm encrypt --key master.key --input secret.txt --output secret.enc

    # Decrypt
    citadel-etm decrypt --key master.key --input secret.enc --output secret.txt

    # Inspect
    citadel-etm inspect --input secret.enc

OPTIONS:
    -k, --key <FILE>      Hex master key file
    -i, --input <FILE>    Read from FILE instead of stdin
    -o, --output <FILE>   Write to FILE instead of stdout
        --raw             Binary ciphertext instead of hex
        --ctr             Encrypt with AES-128-CTR (v2.1)
    -h, --help            Print help
    -V, --version         Print version

Set RUST_LOG=debug for diagnostics."#
    );
}

#[derive(Default)]
struct Options {
    key_path: Option<PathBuf>,
    input_path: Option<PathBuf>,
    output_path: Option<PathBuf>,
    raw: bool,
    ctr: bool,
}

impl Options {
    fn parse(args: &[String]) -> Result<Self, Box<dyn std::error::Error>> {
        let mut opts = Self::default();

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--key" | "-k" => {
                    i += 1;
                    opts.key_path = Some(PathBuf::from(args.get(i).ok_or("missing key path")?));
                }
                "--input" | "-i" => {
                    i += 1;
                    opts.input_path = Some(PathBuf::from(args.get(i).ok_or("missing input path")?));
                }
                "--output" | "-o" => {
                    i += 1;
                    let path = args.get(i).ok_or("missing output path")?;
                    opts.output_path = Some(PathBuf::from(path));
                }
                "--raw" => opts.raw = true,
                "--ctr" => opts.ctr = true,
                _ => return Err(format!("unknown option: {}", args[i]).into()),
            }
            i += 1;
        }

        Ok(opts)
    }

    fn encoding(&self) -> Encoding {
        if self.raw {
            Encoding::Raw
        } else {
            Encoding::Hex
        }
    }

    fn load_key(&self) -> Result<Key, Box<dyn std::error::Error>> {
        let path = self.key_path.as_ref().ok_or("missing --key")?;
        let text = zeroize::Zeroizing::new(fs::read_to_string(path)?);
        Ok(Key::from_hex(&text).map_err(|_| "invalid key file")?)
    }

    fn read_input(&self) -> io::Result<Vec<u8>> {
        match self.input_path {
            Some(ref path) => fs::read(path),
            None => {
                let mut buf = Vec::new();
                io::stdin().read_to_end(&mut buf)?;
                Ok(buf)
            }
        }
    }

    fn write_output(&self, data: &[u8]) -> io::Result<()> {
        match self.output_path {
            Some(ref path) => fs::write(path, data),
            None => io::stdout().write_all(data),
        }
    }
}

/// Hex ciphertexts often arrive with a trailing newline.
fn trim_text(data: &[u8], encoding: Encoding) -> &[u8] {
    if encoding == Encoding::Raw {
        return data;
    }
    let start = data.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(data.len());
    let end = data.iter().rposition(|b| !b.is_ascii_whitespace()).map_or(start, |i| i + 1);
    &data[start..end]
}

fn cmd_keygen(args: &[String]) -> CliResult {
    let opts = Options::parse(args)?;
    let output_path = opts.output_path.as_ref().ok_or("missing --output")?;

    let key = citadel_etm::generate_key()?;
    fs::write(output_path, format!("{}\n", key.to_hex().as_str()))?;

    // Restrict key permissions (Unix only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(output_path)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(output_path, perms)?;
    }

    eprintln!("Generated master key:");
    eprintln!("  Key file:  {} (mode 600)", output_path.display());
    eprintln!("  Key size:  {} bytes", citadel_etm::KEY_BYTE_SIZE);

    Ok(())
}

fn cmd_encrypt(args: &[String]) -> CliResult {
    let opts = Options::parse(args)?;
    let key = opts.load_key()?;
    let plaintext = opts.read_input()?;

    let version = if opts.ctr { Version::V2Ctr } else { Version::V2Cbc };
    let crypto = Crypto::new().with_version(version);
    let mut ciphertext = crypto.encrypt(&plaintext, key.as_bytes(), opts.encoding())?;
    if opts.encoding() == Encoding::Hex {
        ciphertext.push(b'\n');
    }

    opts.write_output(&ciphertext)?;
    eprintln!("Encrypted {} bytes -> {} bytes", plaintext.len(), ciphertext.len());

    Ok(())
}

fn cmd_decrypt(args: &[String]) -> CliResult {
    let opts = Options::parse(args)?;
    let key = opts.load_key()?;
    let input = opts.read_input()?;

    let plaintext = citadel_etm::decrypt(
        trim_text(&input, opts.encoding()),
        key.as_bytes(),
        opts.encoding(),
    )?;

    opts.write_output(&plaintext)?;
    if opts.output_path.is_some() {
        eprintln!("Decrypted {} bytes -> {} bytes", input.len(), plaintext.len());
    }

    Ok(())
}

fn cmd_legacy_decrypt(args: &[String]) -> CliResult {
    let opts = Options::parse(args)?;
    let key = opts.load_key()?;
    let ciphertext = opts.read_input()?;

    let plaintext = citadel_etm::legacy_decrypt(&ciphertext, key.as_bytes())?;

    opts.write_output(&plaintext)?;
    if opts.output_path.is_some() {
        eprintln!("Decrypted {} bytes -> {} bytes", ciphertext.len(), plaintext.len());
    }

    Ok(())
}

fn cmd_inspect(args: &[String]) -> CliResult {
    let opts = Options::parse(args)?;
    let input = opts.read_input()?;

    let info = citadel_etm::inspect(trim_text(&input, opts.encoding()), opts.encoding())?;

    println!("Citadel ETM Ciphertext");
    println!("======================");
    println!("Version:         {}.{}", info.major, info.minor);
    println!("Cipher:          {}", info.cipher);
    println!("MAC:             HMAC-{}", info.hash);
    println!();
    println!("Total Size:      {} bytes", info.total_bytes);
    println!("Payload Size:    {} bytes", info.payload_bytes);

    Ok(())
}

fn cmd_self_test() -> CliResult {
    citadel_etm::self_test()?;
    println!("self-test: {:?}", citadel_etm::self_test_state());
    Ok(())
}
