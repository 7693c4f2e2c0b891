use std::io;
use std::path::Path;
use std::process::ExitCode;

use clap::Command;
use journal_audit::{
	commands::{
		reclaim_tail_waste, report_entry_arrays, report_layout, report_tail_waste, report_usage,
		verify_hashes,
	},
	ident,
	impls::JournalFile,
	set::{JournalSet, OpenMode, PERSISTENT_PATH},
};
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _, EnvFilter};

const LICENSE: &str = concat!(
	"\n",
	" Permission is hereby granted, free of charge, to any person obtaining\n",
	" a copy of this software and associated documentation files (the\n",
	" \"Software\"), to deal in the Software without restriction, including\n",
	" without limitation the rights to use, copy, modify, merge, publish,\n",
	" distribute, sublicense, and/or sell copies of the Software, and to\n",
	" permit persons to whom the Software is furnished to do so, subject to\n",
	" the condition that the above copyright notice and this permission\n",
	" notice shall be included in all copies or substantial portions of the\n",
	" Software.\n",
	"\n",
	" THE SOFTWARE IS PROVIDED \"AS IS\", WITHOUT WARRANTY OF ANY KIND.\n",
);

fn cli() -> Command {
	Command::new("jaudit")
		.about("Inspect, verify, and reclaim space from journald binary log files")
		.subcommand(Command::new("license").about("print license header"))
		.subcommand(Command::new("version").about("print jaudit version"))
		.subcommand(
			Command::new("reclaim")
				.about("reclaim space from journal files")
				.subcommand(
					Command::new("tail-waste")
						.about("reclaim wasted space from tails of archives"),
				),
		)
		.subcommand(
			Command::new("report")
				.about("report statistics about journal files")
				.subcommand(
					Command::new("entry-arrays")
						.about("report statistics about entry array objects per journal"),
				)
				.subcommand(
					Command::new("layout")
						.about("report layout of objects, writes a .layout file per journal"),
				)
				.subcommand(
					Command::new("tail-waste")
						.about("report extra space allocated onto tails"),
				)
				.subcommand(
					Command::new("usage").about("report space used by various object types"),
				),
		)
		.subcommand(
			Command::new("verify")
				.about("verify journal file contents")
				.subcommand(
					Command::new("hashes")
						.about("verify content hashes of all hashed objects"),
				),
		)
}

async fn open_set(mode: OpenMode) -> io::Result<JournalSet<JournalFile>> {
	let machine_id = ident::machine_id().await?;
	JournalSet::open_host(Path::new(PERSISTENT_PATH), &machine_id, mode).await
}

async fn reclaim_tail_waste_cmd() -> io::Result<()> {
	let mut set = open_set(OpenMode::ReadWrite).await?;

	println!("\nReclaiming tail-waste...");
	let stats = reclaim_tail_waste::run(&mut set).await?;
	reclaim_tail_waste::print_summary(&stats);
	Ok(())
}

async fn report_entry_arrays_cmd() -> io::Result<()> {
	let mut set = open_set(OpenMode::ReadOnly).await?;

	for (name, summary) in report_entry_arrays::run(&mut set).await? {
		report_entry_arrays::print_summary(&name, &summary);
	}
	Ok(())
}

async fn report_layout_cmd() -> io::Result<()> {
	let mut set = open_set(OpenMode::ReadOnly).await?;
	report_layout::run(&mut set, Path::new(".")).await?;
	Ok(())
}

async fn report_tail_waste_cmd() -> io::Result<()> {
	let mut set = open_set(OpenMode::ReadOnly).await?;

	println!("\nPer-journal:");
	let stats = report_tail_waste::run(&mut set).await?;
	report_tail_waste::print_totals(&stats);
	Ok(())
}

async fn report_usage_cmd() -> io::Result<()> {
	let mut set = open_set(OpenMode::ReadOnly).await?;
	let usage = report_usage::run(&mut set).await?;
	report_usage::print_usage(&usage);
	Ok(())
}

async fn verify_hashes_cmd() -> io::Result<()> {
	let mut set = open_set(OpenMode::ReadOnly).await?;
	let stats = verify_hashes::run(&mut set).await?;
	println!(
		"Verified {} hashed objects ({} skipped)",
		stats.n_verified, stats.n_skipped,
	);
	Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
	tracing_subscriber::registry()
		.with(
			EnvFilter::try_from_default_env()
				.or_else(|_| EnvFilter::try_new("warn"))
				.unwrap(),
		)
		.with(tracing_subscriber::fmt::layer().with_target(false).without_time())
		.init();

	let matches = cli().get_matches();
	let result = match matches.subcommand() {
		Some(("license", _)) => {
			println!("{LICENSE}");
			Ok(())
		}
		Some(("version", _)) => {
			println!("jaudit version {}", env!("CARGO_PKG_VERSION"));
			Ok(())
		}
		Some(("reclaim", sub)) => match sub.subcommand() {
			Some(("tail-waste", _)) => reclaim_tail_waste_cmd().await,
			_ => {
				println!("Usage: jaudit reclaim {{tail-waste}}");
				Ok(())
			}
		},
		Some(("report", sub)) => match sub.subcommand() {
			Some(("entry-arrays", _)) => report_entry_arrays_cmd().await,
			Some(("layout", _)) => report_layout_cmd().await,
			Some(("tail-waste", _)) => report_tail_waste_cmd().await,
			Some(("usage", _)) => report_usage_cmd().await,
			_ => {
				println!("Usage: jaudit report {{entry-arrays,layout,tail-waste,usage}}");
				Ok(())
			}
		},
		Some(("verify", sub)) => match sub.subcommand() {
			Some(("hashes", _)) => verify_hashes_cmd().await,
			_ => {
				println!("Usage: jaudit verify {{hashes}}");
				Ok(())
			}
		},
		_ => {
			let _ = cli().print_help();
			Ok(())
		}
	};

	match result {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			eprintln!("jaudit error: {err}");
			ExitCode::FAILURE
		}
	}
}
