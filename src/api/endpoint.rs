use chrono::NaiveDate;
use itertools::Itertools;
use serde_json::{Map, Value};

use super::Args;
use crate::datetime::availability::format_date;
use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
}

impl From<Verb> for oauth2::http::Method {
    fn from(verb: Verb) -> Self {
        match verb {
            Verb::Get => oauth2::http::Method::GET,
            Verb::Post => oauth2::http::Method::POST,
        }
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verb::Get => write!(f, "GET"),
            Verb::Post => write!(f, "POST"),
        }
    }
}

/// Value a parameter takes when the caller does not supply it.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamDefault {
    /// Leave the parameter out of the request.
    Omit,
    /// The current local date, computed when the call is made.
    Today,
    Date(NaiveDate),
    List(Vec<String>),
    Value(Value),
}

impl ParamDefault {
    fn resolve(&self, today: NaiveDate) -> Option<Value> {
        match self {
            ParamDefault::Omit => None,
            ParamDefault::Today => Some(Value::from(format_date(&today))),
            ParamDefault::Date(date) => Some(Value::from(format_date(date))),
            ParamDefault::List(items) => Some(Value::from(items.iter().join(","))),
            ParamDefault::Value(value) => Some(value.clone()),
        }
    }
}

impl From<bool> for ParamDefault {
    fn from(value: bool) -> Self {
        ParamDefault::Value(Value::from(value))
    }
}

impl From<i32> for ParamDefault {
    fn from(value: i32) -> Self {
        ParamDefault::Value(Value::from(value))
    }
}

impl From<i64> for ParamDefault {
    fn from(value: i64) -> Self {
        ParamDefault::Value(Value::from(value))
    }
}

impl From<&str> for ParamDefault {
    fn from(value: &str) -> Self {
        ParamDefault::Value(Value::from(value))
    }
}

impl From<NaiveDate> for ParamDefault {
    fn from(date: NaiveDate) -> Self {
        ParamDefault::Date(date)
    }
}

/// Fills a path template from the call arguments. `Err` names the missing
/// argument.
pub type PathResolver = fn(&str, &Args) -> std::result::Result<String, String>;

/// Replaces every `{name}` in the template with the argument of that name.
/// Lists are joined with commas.
pub fn substitute(template: &str, args: &Args) -> std::result::Result<String, String> {
    let mut path = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}') else {
            break;
        };
        let name = &rest[open + 1..open + close];
        let value = args.get(name).ok_or_else(|| name.to_string())?;

        path.push_str(&rest[..open]);
        path.push_str(&render(value));
        rest = &rest[open + close + 1..];
    }
    path.push_str(rest);

    Ok(path)
}

/// Text form of a parameter on the wire.
pub fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_owned(),
        Value::Array(items) => items.iter().map(render).join(","),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn derive_name(path: &str) -> String {
    path.rsplit('/')
        .next()
        .unwrap_or(path)
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

/// Declarative description of one documented endpoint.
#[derive(Clone, Debug)]
pub struct Endpoint {
    pub name: String,
    pub path: &'static str,
    pub verb: Verb,
    pub defaults: Vec<(&'static str, ParamDefault)>,
    pub required: Vec<&'static str>,
    pub resolver: Option<PathResolver>,
}

impl Endpoint {
    pub fn new(verb: Verb, path: &'static str) -> Self {
        Self {
            name: derive_name(path),
            path,
            verb,
            defaults: vec![],
            required: vec![],
            resolver: None,
        }
    }

    pub fn get(path: &'static str) -> Self {
        Self::new(Verb::Get, path)
    }

    pub fn post(path: &'static str) -> Self {
        Self::new(Verb::Post, path)
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_owned();
        self
    }

    pub fn with_default(mut self, name: &'static str, value: impl Into<ParamDefault>) -> Self {
        self.defaults.push((name, value.into()));
        self
    }

    pub fn omit(self, name: &'static str) -> Self {
        self.with_default(name, ParamDefault::Omit)
    }

    pub fn today(self, name: &'static str) -> Self {
        self.with_default(name, ParamDefault::Today)
    }

    pub fn require(mut self, name: &'static str) -> Self {
        self.required.push(name);
        self
    }

    pub fn resolve_with(mut self, resolver: PathResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn resolve_path(&self, args: &Args) -> Result<String> {
        match self.resolver {
            Some(resolver) => resolver(self.path, args).map_err(|name| self.missing(&name)),
            None => Ok(self.path.to_owned()),
        }
    }

    /// Builds the parameters for one call, using the local date for `Today`.
    pub fn params(&self, args: &Args) -> Result<Map<String, Value>> {
        self.params_on(args, chrono::Local::now().date_naive())
    }

    pub(crate) fn params_on(&self, args: &Args, today: NaiveDate) -> Result<Map<String, Value>> {
        let mut params = Map::new();

        for (name, default) in &self.defaults {
            if let Some(value) = default.resolve(today) {
                params.insert(name.to_string(), value);
            }
        }

        for (name, value) in args.iter() {
            params.insert(name.to_owned(), value.clone());
        }

        for name in &self.required {
            let value = args.get(name).ok_or_else(|| self.missing(name))?;
            params.insert(name.to_string(), value.clone());
        }

        // The service has no boolean type.
        for value in params.values_mut() {
            if let Value::Bool(flag) = value {
                *value = Value::from(u8::from(*flag));
            }
        }

        Ok(params)
    }

    fn missing(&self, name: &str) -> Error {
        Error::MissingParameter {
            operation: self.name.to_owned(),
            name: name.to_owned(),
        }
    }
}
