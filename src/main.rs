use std::net::IpAddr;
use std::process::ExitCode;
use std::rc::Rc;
use std::str::FromStr;
use std::time::Duration;

use clap::{ArgAction, Parser};
use console::style;
use hickory_proto::op::{Message, MessageType};
use hickory_proto::rr::{Name, RecordType};
use tracing_subscriber::EnvFilter;

use dnswalk::{
    Config, Nameserver, NetworkExchange, Query, Response, ResponseSet, ResponseType, Tracer, recursive_query,
};

#[derive(Parser)]
#[command(name = "dnswalk")]
#[command(about = "Trace DNS resolution from the root servers down", long_about = None)]
struct Args {
    /// Optional record type followed by the domain, e.g. `AAAA example.com`
    #[arg(value_name = "[QTYPE] DOMAIN", num_args = 1..=2, required = true)]
    target: Vec<String>,

    /// Enable colors (the default)
    #[arg(long, overrides_with = "no_color")]
    color: bool,

    /// Disable colors
    #[arg(long, overrides_with = "color")]
    no_color: bool,

    /// Only print nameservers
    #[arg(long)]
    nsonly: bool,

    /// With --nsonly, only print nameservers that came without glue
    #[arg(long)]
    noglueonly: bool,

    /// Per-query timeout in milliseconds
    #[arg(long, default_value = "500")]
    timeout: u64,

    /// Attempts against an unresponsive zone before giving up
    #[arg(long, default_value = "10")]
    retries: usize,

    /// Skip IPv6 nameserver addresses
    #[arg(long = "no-ipv6", action = ArgAction::SetFalse)]
    ipv6: bool,

    /// Start from these addresses instead of the IANA root servers
    #[arg(long, value_delimiter = ',')]
    root: Vec<IpAddr>,

    /// Log resolver decisions to stderr
    #[arg(short, long)]
    verbose: bool,
}

/// Prints each step as the walk progresses.
struct Printer {
    nsonly: bool,
    noglueonly: bool,
}

impl Tracer for Printer {
    fn on_step(&mut self, step: usize, query: &Message, responses: &ResponseSet, rtype: &ResponseType) {
        if self.nsonly {
            return;
        }

        if step > 1 {
            println!();
        }
        if let Some(question) = query.queries().first() {
            print!("{step} - query {} {}", question.query_type(), question.name());
        }
        let fastest = responses.fastest().and_then(Response::message);
        if let Some(message) = fastest {
            print!(": {}", header_summary(message));
        }
        println!();

        if responses.is_empty() {
            println!("{}", style("  - no nameserver address to query").red());
        }
        for response in responses {
            println!("{}", server_line(response));
        }

        if let (ResponseType::Cname(_), Some(message)) = (rtype, fastest) {
            for rr in message.answers() {
                println!("{rr}");
            }
        }
    }

    fn on_cname(&mut self, from: &Name, to: &Name) {
        println!("{}", style(format!("\n~ following CNAME {from} -> {to}")).blue());
    }

    fn on_delegation(&mut self, zone: &Name, nameservers: &[Rc<Nameserver>], _reused: bool) {
        for ns in nameservers {
            if self.nsonly {
                if !self.noglueonly || !ns.has_glue {
                    println!("{}", ns.name);
                }
                continue;
            }

            let glue = if ns.has_glue {
                let addrs: Vec<String> = ns.addrs.iter().map(IpAddr::to_string).collect();
                style(format!("glue: {}", addrs.join(","))).dim()
            } else {
                style("no glue".to_string()).yellow()
            };
            println!("{zone} {} NS {} ({glue})", ns.ttl, ns.name);
        }
    }
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// `opcode: QUERY, status: NOERROR, id: 1234, flags: qr aa`
fn header_summary(message: &Message) -> String {
    let header = message.header();
    let flags: Vec<&str> = [
        (header.message_type() == MessageType::Response, "qr"),
        (header.authoritative(), "aa"),
        (header.truncated(), "tc"),
        (header.recursion_desired(), "rd"),
        (header.recursion_available(), "ra"),
        (header.authentic_data(), "ad"),
        (header.checking_disabled(), "cd"),
    ]
    .into_iter()
    .filter_map(|(set, flag)| set.then_some(flag))
    .collect();

    format!(
        "opcode: {}, status: {}, id: {}, flags: {}",
        format!("{:?}", header.op_code()).to_uppercase(),
        format!("{:?}", header.response_code()).to_uppercase(),
        header.id(),
        flags.join(" ")
    )
}

fn server_line(response: &Response) -> String {
    let lookup = if response.server.has_glue {
        "0ms (from glue)".to_string()
    } else if response.lookup_cost().is_zero() {
        "0ms (from cache)".to_string()
    } else {
        format!("{:.2}ms", millis(response.server.lookup_rtt))
    };

    let mut line = style(format!(
        "  - {} bytes in {:.2}ms + {} lookup on {}({})",
        response.size(),
        millis(response.rtt),
        lookup,
        response.server.name,
        response.addr
    ))
    .dim()
    .to_string();

    if let Some(e) = response.error() {
        line.push_str(&format!(": {}", style(e).red()));
    }
    line
}

/// Split `[qtype] <domain>` in either order.
fn parse_target(args: &[String]) -> Result<(Name, RecordType), String> {
    let mut qname = None;
    let mut qtype = RecordType::A;

    for arg in args {
        if let Ok(rtype) = RecordType::from_str(arg) {
            qtype = rtype;
            continue;
        }
        if qname.is_some() {
            return Err("more than one domain given".to_string());
        }
        let mut name = Name::from_ascii(arg).map_err(|e| format!("invalid domain {arg}: {e}"))?;
        name.set_fqdn(true);
        qname = Some(name);
    }

    let qname = qname.ok_or_else(|| "no domain given".to_string())?;
    Ok((qname, qtype))
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "error" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() { ExitCode::FAILURE } else { ExitCode::SUCCESS };
        }
    };

    init_logging(args.verbose);
    if args.no_color {
        console::set_colors_enabled(false);
    }

    let (qname, qtype) = match parse_target(&args.target) {
        Ok(target) => target,
        Err(e) => {
            eprintln!("{e}\n\nUsage: dnswalk [qtype] <domain>");
            return ExitCode::FAILURE;
        }
    };

    let config = Config {
        timeout: Duration::from_millis(args.timeout),
        max_retries: args.retries,
        ipv6: args.ipv6,
        ..Config::default()
    }
    .with_roots(args.root);
    let query = Query::from_config(qname, qtype, &config);

    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut printer = Printer {
        nsonly: args.nsonly,
        noglueonly: args.noglueonly,
    };
    let local = tokio::task::LocalSet::new();
    let result = local.block_on(&rt, recursive_query(&NetworkExchange, &config, &query, &mut printer));

    match result {
        Ok(resolution) => {
            if !args.nsonly {
                println!();
                println!("{}", style(format!(";; Cold best path time: {:?}\n", resolution.cold_path)).white());
                for rr in resolution.message.answers() {
                    println!("{rr}");
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("{}", style(format!("*** error: {e}")).red());
            ExitCode::FAILURE
        }
    }
}
