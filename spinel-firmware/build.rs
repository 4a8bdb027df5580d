//! Build script for spinel-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates channels.toml and turns it into a const channel table

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

const CHANNELS: [&str; 5] = ["spi1", "spi2", "spi3", "spi4", "spi5"];
const DIVISORS: [i64; 8] = [2, 4, 8, 16, 32, 64, 128, 256];

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    setup_linker(&out_dir);
    let channels = validate_config();
    generate_table(&out_dir, &channels);
}

/// Set up linker search paths for memory.x
fn setup_linker(out_dir: &Path) {
    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// One validated `[spiN]` table
struct Channel {
    master: bool,
    software_select: bool,
    topology: &'static str,
    divisor: i64,
    select: Option<(char, u8, bool)>,
}

/// Validate channels.toml at compile time
fn validate_config() -> [Option<Channel>; 5] {
    println!("cargo:rerun-if-changed=channels.toml");

    let config_path = Path::new("channels.toml");
    if !config_path.exists() {
        fail(
            "channels.toml not found",
            &["The firmware requires a channels.toml next to Cargo.toml.".to_string()],
        );
    }

    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => fail("Failed to read channels.toml", &[e.to_string()]),
    };

    let config: toml::Value = match toml::from_str(&content) {
        Ok(value) => value,
        Err(e) => fail(
            "Invalid TOML syntax in channels.toml",
            &e.to_string().lines().map(str::to_string).collect::<Vec<_>>(),
        ),
    };

    let table = match config.as_table() {
        Some(t) => t,
        None => fail("channels.toml must be a table", &[]),
    };

    let mut errors = Vec::new();

    for key in table.keys() {
        if !CHANNELS.contains(&key.as_str()) {
            errors.push(format!("unknown section [{}] (expected spi1..spi5)", key));
        }
    }

    let channels = CHANNELS.map(|name| {
        table
            .get(name)
            .and_then(|section| validate_channel(name, section, &mut errors))
    });

    if !errors.is_empty() {
        fail("Invalid channel configuration", &errors);
    }

    println!("cargo:warning=channels.toml validated successfully");
    channels
}

fn validate_channel(name: &str, section: &toml::Value, errors: &mut Vec<String>) -> Option<Channel> {
    let section = match section.as_table() {
        Some(t) => t,
        None => {
            errors.push(format!("[{}] must be a table", name));
            return None;
        }
    };

    let start = errors.len();

    let master = match section.get("role").and_then(|v| v.as_str()) {
        Some("master") => true,
        Some("slave") => false,
        Some(other) => {
            errors.push(format!("[{}] role '{}' must be 'master' or 'slave'", name, other));
            false
        }
        None => {
            errors.push(format!("[{}] missing 'role'", name));
            false
        }
    };

    let topology = match section.get("topology").and_then(|v| v.as_str()) {
        Some("full_duplex") | None => "FullDuplex",
        Some("receive_only") => "ReceiveOnly",
        Some("bidirectional") => "Bidirectional",
        Some(other) => {
            errors.push(format!(
                "[{}] topology '{}' must be full_duplex, receive_only or bidirectional",
                name, other
            ));
            "FullDuplex"
        }
    };

    let software_select = match section.get("slave_management").and_then(|v| v.as_str()) {
        Some("software") => true,
        Some("hardware") => false,
        None => master,
        Some(other) => {
            errors.push(format!(
                "[{}] slave_management '{}' must be 'software' or 'hardware'",
                name, other
            ));
            master
        }
    };

    let divisor = match section.get("baud_rate") {
        Some(toml::Value::Integer(d)) if DIVISORS.contains(d) => *d,
        Some(_) => {
            errors.push(format!(
                "[{}] baud_rate must be one of 2, 4, 8, 16, 32, 64, 128, 256",
                name
            ));
            8
        }
        None if master => {
            errors.push(format!("[{}] masters need 'baud_rate'", name));
            8
        }
        None => 2,
    };

    let select = match section.get("select") {
        Some(toml::Value::String(pin)) => match parse_pin(pin) {
            Some(pin) => Some(pin),
            None => {
                errors.push(format!("[{}] select '{}' is not a pin like PA4 or !PB12", name, pin));
                None
            }
        },
        Some(_) => {
            errors.push(format!("[{}] select must be a string", name));
            None
        }
        None => None,
    };

    if master && select.is_none() && errors.len() == start {
        errors.push(format!("[{}] masters need a 'select' pin", name));
    }

    if errors.len() > start {
        return None;
    }

    Some(Channel {
        master,
        software_select,
        topology,
        divisor,
        select,
    })
}

/// Parse "PA4" / "!PB12" into (port, pin, active_low)
fn parse_pin(s: &str) -> Option<(char, u8, bool)> {
    let s = s.trim();
    let (s, active_low) = match s.strip_prefix('!') {
        Some(rest) => (rest, true),
        None => (s, false),
    };

    let rest = s.strip_prefix('P')?;
    let mut chars = rest.chars();
    let port = chars.next()?;
    if !('A'..='K').contains(&port) {
        return None;
    }

    let number: u8 = chars.as_str().parse().ok()?;
    if number > 15 {
        return None;
    }

    Some((port, number, active_low))
}

/// Write `$OUT_DIR/channels.rs`
fn generate_table(out_dir: &Path, channels: &[Option<Channel>; 5]) {
    let mut configs = String::new();
    let mut selects = String::new();

    for channel in channels {
        match channel {
            Some(ch) => {
                configs.push_str(&format!(
                    "    ChannelConfig {{\n        \
                     enabled: true,\n        \
                     role: Role::{},\n        \
                     slave_management: SlaveManagement::{},\n        \
                     topology: Topology::{},\n        \
                     baud_rate: BaudRate::Div{},\n    \
                     }},\n",
                    if ch.master { "Master" } else { "Slave" },
                    if ch.software_select { "Software" } else { "Hardware" },
                    ch.topology,
                    ch.divisor,
                ));
                match ch.select {
                    Some((port, number, active_low)) => selects.push_str(&format!(
                        "    Some(SlaveSelect::{}(PinId::new('{}', {}))),\n",
                        if active_low { "active_low" } else { "active_high" },
                        port,
                        number
                    )),
                    None => selects.push_str("    None,\n"),
                }
            }
            None => {
                configs.push_str("    ChannelConfig::DISABLED,\n");
                selects.push_str("    None,\n");
            }
        }
    }

    let source = format!(
        "// Generated from channels.toml by build.rs\n\
         \n\
         use spinel_core::config::{{BaudRate, ChannelConfig, ConfigTable, Role, SlaveManagement, Topology}};\n\
         use spinel_core::{{Channel, PinId, SlaveSelect}};\n\
         \n\
         /// Startup configuration of every SPI block\n\
         pub const CHANNEL_TABLE: ConfigTable = ConfigTable::new([\n{}]);\n\
         \n\
         /// Slave-select line of each master channel\n\
         pub const SLAVE_SELECTS: [Option<SlaveSelect>; Channel::COUNT] = [\n{}];\n",
        configs, selects
    );

    fs::write(out_dir.join("channels.rs"), source).unwrap();
}

/// Abort the build with a boxed error message
fn fail(title: &str, lines: &[String]) -> ! {
    let body = lines
        .iter()
        .map(|line| {
            let truncated = if line.len() > 62 {
                format!("{}...", &line[..59])
            } else {
                line.to_string()
            };
            format!("║  • {:<62} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n");

    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title, body
    );
}
