//! Output script composition.
//!
//! Turns a script expression into one [`Payment`] per key-range index. Wildcard keys are
//! resolved through the [`Context`], so the same tree yields different results under different
//! options.

use bitcoin::script::Script;
use bitcoin::{Address, PublicKey, ScriptBuf};

use crate::context::Context;
use crate::descriptor::{ScriptExpression, ScriptNode};
use crate::error::{Error, Result};
use crate::keys::KeyExpression;
use crate::payment::Payment;

/// Keeps the present entries of a resolved list.
///
/// When non-existent indices are replaced by the next index, the replacement repeats the entry
/// that follows it; an entry equal to the one just before it is dropped.
fn collect_resolved<T: PartialEq>(ctx: &Context, items: Vec<Option<T>>) -> Vec<T> {
    let mut items: Vec<T> = items.into_iter().flatten().collect();
    if ctx.ignore_nonexistent_path_index() {
        items.dedup();
    }
    items
}

fn resolved_keys(ctx: &Context, key: &KeyExpression) -> Result<Vec<PublicKey>> {
    Ok(collect_resolved(ctx, key.public_keys(ctx)?))
}

/// One key set per key-range index: the i-th key of every wildcard key next to the fixed keys.
fn key_sets(
    ctx: &Context,
    script: &ScriptExpression,
    keys: &[KeyExpression],
    sorted: bool,
) -> Result<Vec<Vec<PublicKey>>> {
    let count = script
        .key_range()?
        .map_or(1, |range| range.count() as usize);
    let resolved = keys
        .iter()
        .map(|key| key.public_keys(ctx))
        .collect::<Result<Vec<_>>>()?;

    let sets = (0..count)
        .map(|idx| {
            let set = keys
                .iter()
                .zip(&resolved)
                .map(|(key, public_keys)| {
                    let pos = if key.from_range() { idx } else { 0 };
                    public_keys.get(pos).copied().flatten()
                })
                .collect::<Option<Vec<_>>>();

            set.map(|mut set| {
                if sorted {
                    set.sort_by_cached_key(|key| key.to_bytes());
                }
                set
            })
        })
        .collect();

    Ok(collect_resolved(ctx, sets))
}

fn multisig(
    ctx: &Context,
    script: &ScriptExpression,
    threshold: u32,
    keys: &[KeyExpression],
    sorted: bool,
) -> Result<Vec<Payment>> {
    key_sets(ctx, script, keys, sorted)?
        .iter()
        .map(|set| Payment::p2ms(threshold, set))
        .collect()
}

pub(crate) fn payments(ctx: &Context, script: &ScriptExpression) -> Result<Vec<Payment>> {
    let network = script.network();

    let payments = match script.node() {
        ScriptNode::Sh(inner) => payments(ctx, inner)?
            .iter()
            .map(|redeem| Payment::p2sh(redeem, network))
            .collect::<Result<Vec<_>>>()?,
        ScriptNode::Wsh(inner) => payments(ctx, inner)?
            .iter()
            .map(|witness| Payment::p2wsh(witness, network))
            .collect::<Result<Vec<_>>>()?,
        ScriptNode::Pk(key) => resolved_keys(ctx, key)?
            .iter()
            .map(Payment::p2pk)
            .collect(),
        ScriptNode::Pkh(key) => resolved_keys(ctx, key)?
            .iter()
            .map(|key| Payment::p2pkh(key, network))
            .collect(),
        ScriptNode::Wpkh(key) => resolved_keys(ctx, key)?
            .iter()
            .map(|key| Payment::p2wpkh(key, network))
            .collect::<Result<Vec<_>>>()?,
        ScriptNode::Combo(_) => {
            let mut payments = Vec::new();
            for derived in script.derived_scripts()? {
                payments.extend(self::payments(ctx, &derived)?);
            }
            payments
        }
        ScriptNode::Multi { threshold, keys } => {
            multisig(ctx, script, threshold.value(), keys, false)?
        }
        ScriptNode::SortedMulti { threshold, keys } => {
            multisig(ctx, script, threshold.value(), keys, true)?
        }
        ScriptNode::Addr(addr) => vec![addr.payment().clone()],
        ScriptNode::Raw(hex) => vec![Payment::from_output_script(
            Script::from_bytes(hex.value()),
            network,
        )?],
    };

    tracing::trace!(
        script_type = %script.script_type(),
        count = payments.len(),
        "composed payments"
    );
    Ok(payments)
}

pub(crate) fn output_scripts(ctx: &Context, script: &ScriptExpression) -> Result<Vec<ScriptBuf>> {
    match script.node() {
        // the literal bytes, standard or not
        ScriptNode::Raw(hex) => Ok(vec![ScriptBuf::from_bytes(hex.value().to_vec())]),
        _ => Ok(payments(ctx, script)?
            .into_iter()
            .map(Payment::into_output_script)
            .collect()),
    }
}

pub(crate) fn addresses(ctx: &Context, script: &ScriptExpression) -> Result<Vec<Address>> {
    match script.node() {
        ScriptNode::Pk(_) | ScriptNode::Multi { .. } | ScriptNode::SortedMulti { .. } => {
            Ok(Vec::new())
        }
        ScriptNode::Raw(hex) => {
            match Payment::from_output_script(Script::from_bytes(hex.value()), script.network()) {
                Ok(payment) => Ok(payment.address().cloned().into_iter().collect()),
                Err(Error::UnsupportedOutput(_)) => Ok(Vec::new()),
                Err(e) => Err(e),
            }
        }
        _ => Ok(payments(ctx, script)?
            .iter()
            .filter_map(|payment| payment.address().cloned())
            .collect()),
    }
}
