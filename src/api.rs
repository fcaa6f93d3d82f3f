use crate::columns::{Column, validate_columns};
use crate::condition::Condition;
use crate::error::{ListingError, LowMemory, ServerTypeError};
use crate::grammar::{Grammar, Languages, NextItem};
use crate::record::{FieldSet, ListingItem};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Parsing context.
///
/// This holds the environment needed to complete dates of a listing.
#[derive(Debug, Clone)]
pub struct Context {
    /// Local date used for entries that carry a time instead of a year.
    pub today: NaiveDate,
    /// The listing was cut off; a partial last entry is skipped silently.
    pub listing_incomplete: bool,
}

impl Default for Context {
    fn default() -> Self {
        if cfg!(test) {
            Self { today: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap_or_default(), listing_incomplete: false }
        } else {
            Self { today: Local::now().date_naive(), listing_incomplete: false }
        }
    }
}

/// Definition of a server type, as stored in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerTypeDef {
    pub name: String,
    /// Autodetection condition; empty for "always".
    #[serde(default)]
    pub autodetect: String,
    pub columns: Vec<Column>,
    /// Listing grammar source.
    pub rules: String,
}

/// A compiled server type: autodetection condition plus listing grammar.
#[derive(Debug)]
pub struct ServerType {
    name: String,
    condition: Condition,
    grammar: Grammar,
}

impl ServerType {
    pub fn compile(def: &ServerTypeDef) -> Result<Self, ServerTypeError> {
        let name = def.name.clone();
        let condition = Condition::compile(&def.autodetect)
            .map_err(|source| ServerTypeError::Condition { name: name.clone(), source })?;
        validate_columns(&def.columns).map_err(|source| ServerTypeError::Columns { name: name.clone(), source })?;
        let grammar = Grammar::compile(&def.rules, &def.columns)
            .map_err(|source| ServerTypeError::Rules { name: name.clone(), source })?;
        Ok(ServerType { name, condition, grammar })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn columns(&self) -> &[Column] {
        self.grammar.columns()
    }
}

/// Items of a completely parsed listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedListing {
    pub items: Vec<ListingItem>,
    /// Month-name languages still consistent with the listing.
    #[serde(skip)]
    pub languages: Languages,
}

/// Outcome of [`autodetect`].
#[derive(Debug)]
pub struct Detection<'a> {
    pub server_type: &'a ServerType,
    pub listing: ParsedListing,
}

/// The built-in server types, compiled once.
pub fn builtin_server_types() -> &'static [ServerType] {
    &crate::rules::BUILTIN
}

/// Parse the whole `listing` with one server type.
///
/// Fails unless the rules consume the listing up to its end. The `.` and `..`
/// entries are not reported.
pub fn parse_listing(server_type: &ServerType, listing: &[u8], ctx: &Context) -> Result<ParsedListing, ListingError> {
    let grammar = server_type.grammar();
    let mut session = grammar.before_parsing(listing, ctx.today, ctx.listing_incomplete);
    let mut fields = FieldSet::new(grammar.columns().len());
    let mut items = Vec::new();

    loop {
        match session.next_item(&mut fields)? {
            NextItem::Item { item, start } => {
                if item.name == "." || item.name == ".." {
                    tracing::trace!(offset = start, name = %item.name, "dropping directory self/parent entry");
                    continue;
                }
                items.try_reserve(1).map_err(|_| LowMemory)?;
                items.push(item);
            }
            NextItem::End => break,
            NextItem::NoMatch { offset } => {
                tracing::debug!(server_type = %server_type.name, offset, "listing not parsed");
                return Err(ListingError::Unparsed { offset });
            }
        }
    }

    tracing::debug!(server_type = %server_type.name, items = items.len(), "listing parsed");
    Ok(ParsedListing { items, languages: session.languages() })
}

/// Find the first server type that parses the whole `listing`.
///
/// Order of attempts: the `preferred` type (matched by name, ignoring case),
/// then every type whose autodetection condition holds for `welcome`/`syst`,
/// then all remaining types. Each type is tried at most once.
pub fn autodetect<'a>(
    types: &'a [ServerType],
    preferred: Option<&str>,
    welcome: &str,
    syst: &str,
    listing: &[u8],
    ctx: &Context,
) -> Result<Option<Detection<'a>>, LowMemory> {
    let mut order: Vec<usize> = Vec::new();
    order.try_reserve(types.len()).map_err(|_| LowMemory)?;
    if let Some(preferred) = preferred {
        order.extend(types.iter().position(|t| t.name.eq_ignore_ascii_case(preferred)));
    }
    for (i, server_type) in types.iter().enumerate() {
        if !order.contains(&i) && server_type.condition.evaluate(welcome, syst) {
            tracing::debug!(server_type = %server_type.name, "autodetect condition holds");
            order.push(i);
        }
    }
    for i in 0..types.len() {
        if !order.contains(&i) {
            order.push(i);
        }
    }

    for i in order {
        let server_type = &types[i];
        match parse_listing(server_type, listing, ctx) {
            Ok(listing) => {
                tracing::debug!(server_type = %server_type.name, "server type detected");
                return Ok(Some(Detection { server_type, listing }));
            }
            Err(ListingError::Unparsed { .. }) => {}
            Err(ListingError::LowMemory) => return Err(LowMemory),
        }
    }
    tracing::debug!("no server type parses the listing");
    Ok(None)
}
