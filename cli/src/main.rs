use clap::Parser;
use luaw::{Handle, Script, TypeTag, render_error};
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;
use std::str::FromStr;

/// luaw - run a Lua script through the host bridge
#[derive(Parser, Debug)]
#[command(name = "luaw")]
#[command(about = "Run Lua scripts and inspect their globals", long_about = None)]
struct Args {
    /// Script file to run
    script: PathBuf,

    /// Global function to call after the script ran
    #[arg(long, value_name = "NAME")]
    call: Option<String>,

    /// Integer argument for --call (repeatable)
    #[arg(long = "arg", value_name = "INT", allow_hyphen_values = true)]
    args: Vec<i64>,

    /// Print a global coerced to a kind: bool, int, float or string (repeatable)
    #[arg(long = "get", value_name = "NAME:KIND")]
    gets: Vec<GlobalQuery>,

    /// Print the stack before exiting
    #[arg(long)]
    dump_stack: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Bool,
    Int,
    Float,
    String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct GlobalQuery {
    name: String,
    kind: Kind,
}

impl FromStr for GlobalQuery {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, kind) = s
            .rsplit_once(':')
            .ok_or_else(|| format!("expected NAME:KIND, got '{}'", s))?;
        let kind = match kind {
            "bool" => Kind::Bool,
            "int" => Kind::Int,
            "float" => Kind::Float,
            "string" => Kind::String,
            other => return Err(format!("unknown kind '{}'", other)),
        };
        if name.is_empty() {
            return Err("global name is empty".to_string());
        }
        Ok(Self {
            name: name.to_string(),
            kind,
        })
    }
}

/// Adds up every argument as an integer.
fn sum(handle: &Handle) -> luaw::Result<usize> {
    let mut lua = Script::attach(handle);
    let mut total = 0i64;
    for _ in 0..lua.stack_size()? {
        total = total.wrapping_add(lua.pop::<i64>()?);
    }
    lua.push(total)?;
    Ok(1)
}

fn print_global(script: &mut Script<'_>, query: &GlobalQuery) -> luaw::Result<()> {
    let name = query.name.as_str();
    match query.kind {
        Kind::Bool => println!("{} = {}", name, script.get_global::<bool>(name)?),
        Kind::Int => println!("{} = {}", name, script.get_global::<i64>(name)?),
        Kind::Float => println!("{} = {}", name, script.get_global::<f64>(name)?),
        Kind::String => println!("{} = {:?}", name, script.get_global::<String>(name)?),
    }
    Ok(())
}

fn call_global(script: &mut Script<'_>, name: &str, args: &[i64]) -> luaw::Result<()> {
    script.push_global(name)?;
    for arg in args {
        script.push(*arg)?;
    }
    let count = script.call(args.len(), 1)?;

    let mut results = Vec::with_capacity(count);
    for depth in (1..=count).rev() {
        let index = -(depth as i32);
        let text = match script.type_of(index)? {
            TypeTag::Nil => "nil".to_string(),
            TypeTag::Boolean => script.get::<bool>(index)?.to_string(),
            TypeTag::Number | TypeTag::String => script.get::<String>(index)?,
            other => format!("<{}>", other),
        };
        results.push(text);
    }
    script.pop_n(count)?;

    println!("{}({}) -> {}", name, join(args), results.join(", "));
    Ok(())
}

fn join(args: &[i64]) -> String {
    args.iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging subscriber
    use tracing_subscriber::{EnvFilter, fmt};

    // Use RUST_LOG environment variable to control log level
    // Default to WARN if not set
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .into_diagnostic()?;

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut script = Script::new();
    script.register("Sum", sum).into_diagnostic()?;

    if let Err(err) = script.run_file(&args.script) {
        let source = std::fs::read_to_string(&args.script).ok();
        let name = args.script.display().to_string();
        render_error(&err, source.as_deref().map(|text| (name.as_str(), text)));
        std::process::exit(1);
    }
    tracing::debug!(script = %args.script.display(), "script finished");

    for query in &args.gets {
        print_global(&mut script, query).into_diagnostic()?;
    }

    if let Some(name) = &args.call {
        if let Err(err) = call_global(&mut script, name, &args.args) {
            render_error(&err, None);
            std::process::exit(1);
        }
    }

    if args.dump_stack {
        print!("{}", script.dump_stack().into_diagnostic()?);
    }

    script.release();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_global_query() {
        assert_eq!(
            "size:int".parse::<GlobalQuery>(),
            Ok(GlobalQuery {
                name: "size".to_string(),
                kind: Kind::Int,
            })
        );
        assert!("size".parse::<GlobalQuery>().is_err());
        assert!("size:list".parse::<GlobalQuery>().is_err());
        assert!(":int".parse::<GlobalQuery>().is_err());
    }

    #[test]
    fn test_sum_host_function() {
        let mut script = Script::new();
        script.register("Sum", sum).unwrap();
        script.run_string("total = Sum(1, 2, 3)").unwrap();
        assert_eq!(script.get_global::<i64>("total").unwrap(), 6);
    }

    #[test]
    fn test_call_global_consumes_results() {
        let mut script = Script::new();
        script.run_string("function Foo(x) return 2 * x, 'ok' end").unwrap();
        call_global(&mut script, "Foo", &[15]).unwrap();
        assert_eq!(script.stack_size().unwrap(), 0);
    }
}
