//! Rules command implementation.

use crate::cli::RulesArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use lido2rdf_mapping::MappingLoader;

/// Execute the rules command.
pub fn execute_rules(args: RulesArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let schema = config.record_schema()?;
    let rules = MappingLoader::new(schema.namespaces()).load_file(&args.rules)?;

    if args.json {
        println!("{}", formatter.format_rules_json(&rules)?);
    } else if args.x3ml {
        print!("{}", rules.to_x3ml()?);
    } else {
        println!("{}", formatter.format_rules(&rules));
    }

    Ok(())
}
