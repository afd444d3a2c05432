//! Descriptor grammar.
//!
//! A script expression is a call `TYPE(ARG[,ARG...])`. Only the root call may carry a
//! `#checksum` suffix. Arguments are split on commas unless the argument list is a single nested
//! script call, which is parsed recursively with the current type as its parent.

pub mod keys;

use bitcoin::Network;
use lazy_static::lazy_static;
use regex::Regex;

use crate::address::AddrExpression;
use crate::context::Context;
use crate::descriptor::{ScriptExpression, ScriptType};
use crate::error::{Error, Result};
use crate::expression::{Expression, ExpressionType, HexExpression, NumberExpression};
use crate::keys::KeyExpression;
use crate::utils::checksum::verify_checksum;

fn script_tokens() -> String {
    ScriptType::ALL
        .iter()
        .map(ScriptType::as_str)
        .collect::<Vec<_>>()
        .join("|")
}

fn call_grammar() -> String {
    format!(
        r"(?P<type>{})\((?P<args>[^,]+(?:,[^,]+)*)\)",
        script_tokens()
    )
}

lazy_static! {
    static ref ROOT_SCRIPT: Regex = Regex::new(&format!(
        r"^(?P<script>{})(?:#(?P<checksum>[a-z0-9]{{8}}))?$",
        call_grammar()
    ))
    .expect("root script grammar is a valid regex");

    static ref CHILD_SCRIPT: Regex = Regex::new(&format!("^{}$", call_grammar()))
        .expect("child script grammar is a valid regex");

    /// An argument list starting with a script call is a single nested script.
    static ref SCRIPT_ARG: Regex = Regex::new(&format!(r"^(?:{})\(", script_tokens()))
        .expect("script argument grammar is a valid regex");
}

fn grammar_error(text: &str, reason: &'static str) -> Error {
    Error::Grammar {
        text: text.into(),
        reason,
    }
}

/// Parses `text` as a script expression.
///
/// `parent` is the type of the enclosing script, `None` for a complete descriptor.
pub(crate) fn parse_script(
    ctx: &Context,
    network: Network,
    text: &str,
    parent: Option<ScriptType>,
) -> Result<ScriptExpression> {
    if parent.is_none() {
        tracing::debug!(descriptor = text, %network, "parsing descriptor");
    } else {
        tracing::trace!(script = text, "parsing nested script");
    }

    if !text.is_ascii() {
        return Err(grammar_error(text, "non-ascii input"));
    }

    let grammar = match parent {
        None => &*ROOT_SCRIPT,
        Some(_) => &*CHILD_SCRIPT,
    };
    let captures = grammar
        .captures(text)
        .ok_or_else(|| grammar_error(text, "no matching script expression"))?;
    let group = |name| captures.name(name).map_or("", |m| m.as_str());

    let script_type: ScriptType = group("type").parse()?;
    if let Some(parent) = parent {
        if !script_type.can_be_child_of(parent) {
            return Err(grammar_error(
                text,
                "script type not allowed at this nesting level",
            ));
        }
    }

    let checksum = captures.name("checksum").map(|m| m.as_str().to_owned());
    if let Some(checksum) = &checksum {
        verify_checksum(group("script"), checksum)?;
    }

    let args_text = group("args");
    let args: Vec<&str> = if SCRIPT_ARG.is_match(args_text) {
        vec![args_text]
    } else {
        args_text.split(',').collect()
    };

    let arg_types = script_type.arg_types();
    if args.len() < arg_types.len() {
        return Err(Error::MissingArguments {
            expected: arg_types.len(),
            found: args.len(),
        });
    }

    let children = args
        .iter()
        .enumerate()
        .map(|(idx, arg)| {
            let arg_type = arg_types
                .get(idx)
                .or(arg_types.last())
                .copied()
                .unwrap_or(ExpressionType::Script);

            parse_arg(ctx, network, arg, arg_type, script_type).map_err(|source| {
                Error::Argument {
                    index: idx + 1,
                    text: (*arg).to_owned(),
                    source: Box::new(source),
                }
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let script = ScriptExpression::new(network, script_type, text, children, checksum)?;
    if parent.is_none() {
        tracing::debug!(descriptor = text, %script_type, "parsed descriptor");
    }
    Ok(script)
}

fn parse_arg(
    ctx: &Context,
    network: Network,
    text: &str,
    arg_type: ExpressionType,
    parent: ScriptType,
) -> Result<Expression> {
    let expression = match arg_type {
        ExpressionType::Script => ScriptExpression::parse(ctx, network, text, Some(parent))?.into(),
        ExpressionType::Key => KeyExpression::parse(ctx, network, text)?.into(),
        ExpressionType::Addr => AddrExpression::parse(network, text)?.into(),
        ExpressionType::Hex => HexExpression::parse(network, text)?.into(),
        ExpressionType::Number => NumberExpression::parse(network, text)?.into(),
    };
    Ok(expression)
}
