// File: ./src/cli.rs
//! Shared command-line interface logic, like printing help.

pub fn print_help() {
    println!(
        "Vigia v{} - Commitment leak auditor for free-form Spanish text",
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!("USAGE:");
    println!("    vigia ingest <text> [--origin <o>]   Detect commitments in a text");
    println!("    vigia import <file.ics>              Replace the reference calendar");
    println!("    vigia export                         Write the reference calendar as ICS to stdout");
    println!("    vigia list [--status <s>]            Show detected commitments");
    println!("    vigia status <id> <new-status>       Manually override a commitment status");
    println!("    vigia recalc                         Recompute all statuses");
    println!("    vigia --help                         Show this help message");
    println!();
    println!("OPTIONS:");
    println!("    --origin <o>      paste | share | import | manual | notification (default: paste)");
    println!("    --status <s>      pending | leak | covered | expired | discarded");
    println!();
    println!("EXAMPLES:");
    println!("    vigia ingest \"mañana 19:00 dentista\"");
    println!("    vigia import calendario.ics");
    println!("    vigia list --status leak             Commitments with no calendar entry");
    println!("    vigia status <id> discarded          Dismiss a commitment for good");
}
