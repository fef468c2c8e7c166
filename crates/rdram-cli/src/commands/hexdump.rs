//! Hexdump command implementation.
//!
//! Displays raw memory bytes in traditional hexdump format. Addresses are
//! host addresses unless `--console` is given, in which case they are console
//! addresses translated through the located RAM.
//!
//! # Output Format
//!
//! ```text
//! 0x8033B170: 00 00 00 00 00 00 00 00  00 00 00 00 00 00 00 00  |................|
//! ```

use anyhow::Result;
use rdram_core::{BridgeConfig, RamDiscovery, ReadMemory};

use super::attach;
use super::hex_utils::{parse_console_address, parse_hex_address};

/// Run the hexdump command
pub fn run(
    config: &BridgeConfig,
    pid: Option<u32>,
    address: &str,
    size: usize,
    console: bool,
    ascii: bool,
) -> Result<()> {
    let memory = attach(config, pid)?;

    let (start, host) = if console {
        let console_address = parse_console_address(address)?;
        let ram = RamDiscovery::new(memory.as_ref(), config.discovery.clone())
            .locate(config.discovery.method)?;
        (
            console_address as u64,
            ram.host_address(console_address, size)?,
        )
    } else {
        let host = parse_hex_address(address)?;
        (host, host)
    };
    let bytes = memory.read_bytes(host, size)?;

    println!("Hexdump at 0x{:X} ({} bytes):", host, size);
    println!();
    for line in format_lines(start, &bytes, ascii) {
        println!("{}", line);
    }
    Ok(())
}

fn format_lines(start: u64, bytes: &[u8], ascii: bool) -> Vec<String> {
    bytes
        .chunks(16)
        .enumerate()
        .map(|(i, chunk)| {
            let mut line = format!("0x{:X}: ", start + (i * 16) as u64);

            for j in 0..16 {
                if j == 8 {
                    line.push(' ');
                }
                match chunk.get(j) {
                    Some(byte) => line.push_str(&format!("{:02X} ", byte)),
                    None => line.push_str("   "),
                }
            }

            if ascii {
                line.push_str(" |");
                for byte in chunk {
                    line.push(if (0x20..0x7F).contains(byte) {
                        *byte as char
                    } else {
                        '.'
                    });
                }
                line.push_str(&" ".repeat(16 - chunk.len()));
                line.push('|');
            }
            line
        })
        .collect()
}
