use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use clap::Parser;
use clap_num::maybe_hex;

use riscvemu::hart::Hart;
use riscvemu::loader::load_flat_binary;
use riscvemu::memory::Memory;

/// Emulate a flat RV64I binary
#[derive(Parser, Debug)]
#[command(author, version, about, long_about)]
struct Args {
    /// Path to the flat binary program image
    input: PathBuf,

    /// Address the program image is copied to (use 0x prefix for hexadecimal)
    #[arg(short = 'l', long, value_parser=maybe_hex::<u64>, default_value = "0x1000")]
    load_address: u64,

    /// Initial value of the program counter (use 0x prefix for hexadecimal)
    #[arg(short = 'e', long, value_parser=maybe_hex::<u64>, default_value = "0x1000")]
    entry_pc: u64,

    /// Size in bytes of the emulated RAM (use 0x prefix for hexadecimal)
    #[arg(short = 'r', long, value_parser=maybe_hex::<u64>, default_value = "0x100000")]
    ram_size: u64,

    /// Single step through each instruction and print register state
    #[arg(short, long)]
    debug: bool,

    /// Break on program counter match and begin debug stepping (use
    /// 0x prefix for hexadecimal)
    #[arg(short, long, value_parser=maybe_hex::<u64>)]
    pc_breakpoint: Option<u64>,
}

fn press_enter_to_continue() {
    let mut stdin = io::stdin();
    let mut stdout = io::stdout();

    write!(stdout, "Press enter to continue...").unwrap();
    stdout.flush().unwrap();

    let _ = stdin.read(&mut [0u8]).unwrap();
}

fn report_fault(fault: &riscvemu::hart::Fault, hart: &Hart) {
    println!("Got fault {fault} at pc=0x{:x}", hart.pc);
    print!("{}", hart.registers);
}

fn main() {
    let args = Args::parse();

    let mut mem = Memory::new(args.ram_size);
    if let Err(e) = load_flat_binary(&mut mem, &args.input, args.load_address) {
        eprintln!("Error loading program image: {e}");
        std::process::exit(1);
    }

    if args.debug || args.pc_breakpoint.is_some() {
        let mut hart = Hart::new(args.entry_pc);
        let mut stepping = args.debug;
        loop {
            if let Some(pc_breakpoint) = args.pc_breakpoint {
                if hart.pc == pc_breakpoint {
                    stepping = true;
                }
            }

            if let Err(fault) = hart.step(&mut mem) {
                report_fault(&fault, &hart);
                std::process::exit(1);
            }

            print!("{}", String::from_utf8_lossy(&mem.drain_uart()));

            if stepping {
                println!("pc=0x{:x}", hart.pc);
                press_enter_to_continue();
            }
        }
    } else {
        let (uart_tx, uart_rx) = mpsc::channel();

        let emulator_handle = thread::spawn(move || {
            let mut hart = Hart::new(args.entry_pc);
            println!("Beginning execution\n");
            loop {
                if let Err(fault) = hart.step(&mut mem) {
                    report_fault(&fault, &hart);
                    return;
                }
                uart_tx.send(mem.drain_uart()).unwrap();
            }
        });

        let uart_host_handle = thread::spawn(move || loop {
            match uart_rx.recv() {
                Ok(bytes) => print!("{}", String::from_utf8_lossy(&bytes)),
                Err(_) => {
                    println!("UART channel closed");
                    break;
                }
            }
        });

        uart_host_handle.join().unwrap();
        emulator_handle.join().unwrap();
    }
}
