//! obscurcore CLI — pack, unpack, and inspect encrypted packages
//!
//! Usage:
//!   obscurcore pack   --pass <PASSPHRASE> --out <FILE> <INPUT>...
//!   obscurcore unpack --pass <PASSPHRASE> --in <FILE> --out-dir <DIR>
//!   obscurcore inspect --in <FILE>

use std::fs;
use std::path::Path;
use std::process;

use obscurcore::item::ItemType;
use obscurcore::{ManifestCryptoConfig, PackageConfig, PackageReader, PackageWriter, PreKeySource, ReaderKeyInput};

fn usage() -> ! {
    eprintln!(
        "obscurcore — self-describing authenticated encrypted packages\n\
         \n\
         Commands:\n\
         \n\
         Pack one or more files into a package:\n\
         \n\
         obscurcore pack --pass <PASSPHRASE> --out <FILE> <INPUT>...\n\
         \n\
         Unpack a package's items into a directory:\n\
         \n\
         obscurcore unpack --pass <PASSPHRASE> --in <FILE> --out-dir <DIR>\n\
         \n\
         Print a package's manifest header without opening it:\n\
         \n\
         obscurcore inspect --in <FILE>\n"
    );
    process::exit(1);
}

fn die(msg: &str) -> ! {
    eprintln!("error: {}", msg);
    process::exit(1);
}

fn parse_args() -> (String, Vec<(String, String)>, Vec<String>) {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        usage();
    }

    let command = args[1].clone();
    let mut flags: Vec<(String, String)> = Vec::new();
    let mut positional: Vec<String> = Vec::new();

    let mut i = 2;
    while i < args.len() {
        if args[i].starts_with("--") && i + 1 < args.len() {
            flags.push((args[i].clone(), args[i + 1].clone()));
            i += 2;
        } else {
            positional.push(args[i].clone());
            i += 1;
        }
    }

    (command, flags, positional)
}

fn get_flag(flags: &[(String, String)], name: &str) -> Option<String> {
    flags.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone())
}

fn require_flag(flags: &[(String, String)], name: &str) -> String {
    get_flag(flags, name).unwrap_or_else(|| die(&format!("missing required flag: {}", name)))
}

fn cmd_pack(flags: &[(String, String)], inputs: &[String]) {
    let pass = require_flag(flags, "--pass");
    let out_file = require_flag(flags, "--out");
    if inputs.is_empty() {
        die("pack requires at least one input file");
    }

    let mut writer = PackageWriter::new(PackageConfig::balanced(), PreKeySource::Symmetric(pass.into_bytes()));
    for path in inputs {
        let bytes = fs::read(path).unwrap_or_else(|e| die(&format!("read {}: {}", path, e)));
        let name = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.clone());
        writer.add_item(name, ItemType::Binary, bytes);
    }

    let mut out = Vec::new();
    writer.write(&mut out).unwrap_or_else(|e| die(&format!("pack failed: {}", e)));
    fs::write(&out_file, &out).unwrap_or_else(|e| die(&format!("write {}: {}", out_file, e)));

    eprintln!("packed {} item(s) -> {} ({} bytes)", inputs.len(), out_file, out.len());
}

fn cmd_unpack(flags: &[(String, String)]) {
    let pass = require_flag(flags, "--pass");
    let in_file = require_flag(flags, "--in");
    let out_dir = require_flag(flags, "--out-dir");

    let bytes = fs::read(&in_file).unwrap_or_else(|e| die(&format!("read {}: {}", in_file, e)));
    let opened = PackageReader::read(&mut bytes.as_slice(), ReaderKeyInput::Symmetric(alloc_vec(pass.into_bytes())))
        .unwrap_or_else(|e| die(&format!("unpack failed: {}", e)));

    fs::create_dir_all(&out_dir).unwrap_or_else(|e| die(&format!("create {}: {}", out_dir, e)));
    for item in &opened {
        let path = Path::new(&out_dir).join(&item.path);
        fs::write(&path, &item.plaintext).unwrap_or_else(|e| die(&format!("write {}: {}", path.display(), e)));
        eprintln!("unpacked {} ({} bytes)", path.display(), item.plaintext.len());
    }
    eprintln!("unpacked {} item(s) into {}", opened.len(), out_dir);
}

fn alloc_vec(bytes: Vec<u8>) -> Vec<Vec<u8>> {
    vec![bytes]
}

fn cmd_inspect(flags: &[(String, String)]) {
    let in_file = require_flag(flags, "--in");
    let bytes = fs::read(&in_file).unwrap_or_else(|e| die(&format!("read {}: {}", in_file, e)));

    if bytes.len() < 8 || &bytes[0..4] != obscurcore::package::MAGIC.as_slice() {
        die("not an obscurcore package (bad magic)");
    }
    let header_len = u32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize;
    let header_start = 8;
    let header_end = header_start + header_len;
    if bytes.len() < header_end {
        die("truncated manifest header");
    }

    let (format_version, scheme_name, crypto_bytes) =
        obscurcore::manifest::ManifestHeader::decode(&bytes[header_start..header_end])
            .unwrap_or_else(|e| die(&format!("malformed header: {}", e)));
    let crypto_config = obscurcore::manifest::decode_crypto_config(&scheme_name, &crypto_bytes)
        .unwrap_or_else(|e| die(&format!("malformed crypto config: {}", e)));

    println!("format_version: {}", format_version);
    println!("scheme:         {}", scheme_name);
    println!("cipher:         {}", crypto_config.cipher().algorithm);
    println!("authentication: {}", crypto_config.authentication().function_name);
    println!("key_confirmation: {}", crypto_config.key_confirmation().is_some());
    if let ManifestCryptoConfig::Um1Hybrid { ec_domain, .. } = &crypto_config {
        println!("ec_domain:      {:?}", ec_domain);
    }
}

fn main() {
    let (command, flags, positional) = parse_args();

    match command.as_str() {
        "pack" => cmd_pack(&flags, &positional),
        "unpack" => cmd_unpack(&flags),
        "inspect" => cmd_inspect(&flags),
        _ => {
            eprintln!("unknown command: {}", command);
            usage();
        }
    }
}
