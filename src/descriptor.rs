use core::fmt;
use core::str::FromStr;

use bitcoin::{Address, Network, ScriptBuf};

use crate::address::AddrExpression;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::expression::{Expression, ExpressionRef, ExpressionType, HexExpression, NumberExpression};
use crate::keys::{KeyExpression, KeyRange};
use crate::payment::Payment;
use crate::utils::checksum::is_valid_checksum;

/// Script descriptor type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptType {
    /// Pay-to-ScriptHash wrapping a script
    Sh,
    /// Pay-to-Witness-ScriptHash wrapping a script
    Wsh,
    /// Pay-to-PubKey
    Pk,
    /// Pay-to-PubKey-Hash
    Pkh,
    /// Pay-to-Witness-PubKey-Hash
    Wpkh,
    /// pk, pkh and, for compressed keys, wpkh and sh(wpkh)
    Combo,
    /// Bare k-of-n multisig
    Multi,
    /// Bare k-of-n multisig with keys in lexicographic order
    SortedMulti,
    /// The output script of an address
    Addr,
    /// A literal output script
    Raw,
}

impl ScriptType {
    pub const ALL: [ScriptType; 10] = [
        ScriptType::Sh,
        ScriptType::Wsh,
        ScriptType::Pk,
        ScriptType::Pkh,
        ScriptType::Wpkh,
        ScriptType::Combo,
        ScriptType::Multi,
        ScriptType::SortedMulti,
        ScriptType::Addr,
        ScriptType::Raw,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptType::Sh => "sh",
            ScriptType::Wsh => "wsh",
            ScriptType::Pk => "pk",
            ScriptType::Pkh => "pkh",
            ScriptType::Wpkh => "wpkh",
            ScriptType::Combo => "combo",
            ScriptType::Multi => "multi",
            ScriptType::SortedMulti => "sortedmulti",
            ScriptType::Addr => "addr",
            ScriptType::Raw => "raw",
        }
    }

    /// Types of the arguments, in order. The last type repeats for extra arguments.
    pub fn arg_types(&self) -> &'static [ExpressionType] {
        match self {
            ScriptType::Sh | ScriptType::Wsh => &[ExpressionType::Script],
            ScriptType::Pk | ScriptType::Pkh | ScriptType::Wpkh | ScriptType::Combo => {
                &[ExpressionType::Key]
            }
            ScriptType::Multi | ScriptType::SortedMulti => {
                &[ExpressionType::Number, ExpressionType::Key]
            }
            ScriptType::Addr => &[ExpressionType::Addr],
            ScriptType::Raw => &[ExpressionType::Hex],
        }
    }

    /// Whether a script of this type may appear as the argument of `parent`.
    pub fn can_be_child_of(&self, parent: ScriptType) -> bool {
        match self {
            ScriptType::Sh | ScriptType::Combo | ScriptType::Addr | ScriptType::Raw => false,
            ScriptType::Wsh | ScriptType::Wpkh => parent != ScriptType::Wsh,
            _ => true,
        }
    }

    /// Script types a script of this type may wrap.
    fn inner_script_types(&self) -> &'static [ScriptType] {
        match self {
            ScriptType::Sh => &[
                ScriptType::Wsh,
                ScriptType::Pk,
                ScriptType::Pkh,
                ScriptType::Wpkh,
                ScriptType::Multi,
                ScriptType::SortedMulti,
            ],
            ScriptType::Wsh => &[
                ScriptType::Pk,
                ScriptType::Pkh,
                ScriptType::Multi,
                ScriptType::SortedMulti,
            ],
            _ => &[],
        }
    }
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScriptType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ScriptType::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| Error::UnknownScriptType(s.into()))
    }
}

impl TryFrom<&str> for ScriptType {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        ScriptType::from_str(value)
    }
}

/// Children of a script expression, per script type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptNode {
    Sh(Box<ScriptExpression>),
    Wsh(Box<ScriptExpression>),
    Pk(KeyExpression),
    Pkh(KeyExpression),
    Wpkh(KeyExpression),
    Combo(KeyExpression),
    Multi {
        threshold: NumberExpression,
        keys: Vec<KeyExpression>,
    },
    SortedMulti {
        threshold: NumberExpression,
        keys: Vec<KeyExpression>,
    },
    Addr(AddrExpression),
    Raw(HexExpression),
}

impl ScriptNode {
    pub fn script_type(&self) -> ScriptType {
        match self {
            ScriptNode::Sh(_) => ScriptType::Sh,
            ScriptNode::Wsh(_) => ScriptType::Wsh,
            ScriptNode::Pk(_) => ScriptType::Pk,
            ScriptNode::Pkh(_) => ScriptType::Pkh,
            ScriptNode::Wpkh(_) => ScriptType::Wpkh,
            ScriptNode::Combo(_) => ScriptType::Combo,
            ScriptNode::Multi { .. } => ScriptType::Multi,
            ScriptNode::SortedMulti { .. } => ScriptType::SortedMulti,
            ScriptNode::Addr(_) => ScriptType::Addr,
            ScriptNode::Raw(_) => ScriptType::Raw,
        }
    }
}

/// A script expression such as `wsh(multi(2,K1,K2))`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptExpression {
    network: Network,
    text: String,
    checksum: Option<String>,
    node: ScriptNode,
}

fn single_child<T>(
    script_type: ScriptType,
    children: Vec<Expression>,
    expected: &str,
    pick: impl FnOnce(Expression) -> Option<T>,
) -> Result<T> {
    let mut children = children.into_iter();
    match (children.next(), children.next()) {
        (Some(child), None) => {
            let found = child.expression_type();
            pick(child).ok_or_else(|| {
                Error::structural(
                    script_type.as_str(),
                    format!("expected {expected}, got {found}"),
                )
            })
        }
        (None, _) => Err(Error::structural(
            script_type.as_str(),
            format!("expected a single {expected}, got no children"),
        )),
        (Some(_), Some(_)) => Err(Error::structural(
            script_type.as_str(),
            format!(
                "expected a single {expected}, got {} children",
                2 + children.len()
            ),
        )),
    }
}

fn single_script(
    script_type: ScriptType,
    children: Vec<Expression>,
) -> Result<Box<ScriptExpression>> {
    let inner = single_child(script_type, children, "script", |child| match child {
        Expression::Script(script) => Some(script),
        _ => None,
    })?;

    let allowed = script_type.inner_script_types();
    if !allowed.contains(&inner.script_type()) {
        return Err(Error::structural(
            script_type.as_str(),
            format!("{} script cannot be wrapped", inner.script_type()),
        ));
    }
    Ok(Box::new(inner))
}

fn single_key(script_type: ScriptType, children: Vec<Expression>) -> Result<KeyExpression> {
    single_child(script_type, children, "key", |child| match child {
        Expression::Key(key) => Some(key),
        _ => None,
    })
}

fn multi_params(
    script_type: ScriptType,
    children: Vec<Expression>,
) -> Result<(NumberExpression, Vec<KeyExpression>)> {
    let structural = |reason: String| Error::structural(script_type.as_str(), reason);

    if children.len() < 3 {
        return Err(structural(format!(
            "expected a number and at least 2 keys, got {} children",
            children.len()
        )));
    }

    let mut children = children.into_iter();
    let threshold = match children.next() {
        Some(Expression::Number(number)) => number,
        other => {
            return Err(structural(format!(
                "expected number as first child, got {}",
                other.map_or("nothing".into(), |c| c.expression_type().to_string())
            )));
        }
    };

    let keys = children
        .enumerate()
        .map(|(idx, child)| match child {
            Expression::Key(key) => Ok(key),
            other => Err(structural(format!(
                "expected key as child #{}, got {}",
                idx + 2,
                other.expression_type()
            ))),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((threshold, keys))
}

impl ScriptExpression {
    /// Builds a script expression from its children.
    ///
    /// Child count and types are checked against `script_type`, so an expression built here is
    /// as valid as one produced by the parser.
    pub fn new(
        network: Network,
        script_type: ScriptType,
        text: &str,
        children: Vec<Expression>,
        checksum: Option<String>,
    ) -> Result<Self> {
        if let Some(checksum) = &checksum {
            if !is_valid_checksum(checksum) {
                return Err(Error::InvalidChecksum(checksum.clone()));
            }
        }

        if let Some(child) = children.iter().find(|child| child.network() != network) {
            return Err(Error::structural(
                script_type.as_str(),
                format!("child {} belongs to a different network", child.text()),
            ));
        }

        let node = match script_type {
            ScriptType::Sh => ScriptNode::Sh(single_script(script_type, children)?),
            ScriptType::Wsh => ScriptNode::Wsh(single_script(script_type, children)?),
            ScriptType::Pk => ScriptNode::Pk(single_key(script_type, children)?),
            ScriptType::Pkh => ScriptNode::Pkh(single_key(script_type, children)?),
            ScriptType::Wpkh => ScriptNode::Wpkh(single_key(script_type, children)?),
            ScriptType::Combo => ScriptNode::Combo(single_key(script_type, children)?),
            ScriptType::Multi => {
                let (threshold, keys) = multi_params(script_type, children)?;
                ScriptNode::Multi { threshold, keys }
            }
            ScriptType::SortedMulti => {
                let (threshold, keys) = multi_params(script_type, children)?;
                if let Some(key) = keys.iter().find(|key| !key.is_compressed_pub_key()) {
                    return Err(Error::structural(
                        script_type.as_str(),
                        format!("uncompressed public key ({key})"),
                    ));
                }
                ScriptNode::SortedMulti { threshold, keys }
            }
            ScriptType::Addr => ScriptNode::Addr(single_child(
                script_type,
                children,
                "addr",
                |child| match child {
                    Expression::Addr(addr) => Some(addr),
                    _ => None,
                },
            )?),
            ScriptType::Raw => ScriptNode::Raw(single_child(
                script_type,
                children,
                "hex",
                |child| match child {
                    Expression::Hex(hex) => Some(hex),
                    _ => None,
                },
            )?),
        };

        Ok(Self {
            network,
            text: text.into(),
            checksum,
            node,
        })
    }

    /// Parses a script expression nested under `parent`, or a complete descriptor when
    /// `parent` is `None`.
    pub fn parse(
        ctx: &Context,
        network: Network,
        text: &str,
        parent: Option<ScriptType>,
    ) -> Result<Self> {
        crate::parser::parse_script(ctx, network, text, parent)
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Text this expression was built from, including the checksum suffix if any.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn script_type(&self) -> ScriptType {
        self.node.script_type()
    }

    pub fn node(&self) -> &ScriptNode {
        &self.node
    }

    pub fn has_checksum(&self) -> bool {
        self.checksum.is_some()
    }

    pub fn checksum(&self) -> Option<&str> {
        self.checksum.as_deref()
    }

    /// Ordered child expressions.
    pub fn children(&self) -> Vec<ExpressionRef<'_>> {
        match &self.node {
            ScriptNode::Sh(script) | ScriptNode::Wsh(script) => vec![ExpressionRef::Script(script)],
            ScriptNode::Pk(key)
            | ScriptNode::Pkh(key)
            | ScriptNode::Wpkh(key)
            | ScriptNode::Combo(key) => vec![ExpressionRef::Key(key)],
            ScriptNode::Multi { threshold, keys } | ScriptNode::SortedMulti { threshold, keys } => {
                core::iter::once(ExpressionRef::Number(threshold))
                    .chain(keys.iter().map(ExpressionRef::Key))
                    .collect()
            }
            ScriptNode::Addr(addr) => vec![ExpressionRef::Addr(addr)],
            ScriptNode::Raw(hex) => vec![ExpressionRef::Hex(hex)],
        }
    }

    /// Wrapped script of `sh` and `wsh`.
    pub fn script_param(&self) -> Option<&ScriptExpression> {
        match &self.node {
            ScriptNode::Sh(script) | ScriptNode::Wsh(script) => Some(script),
            _ => None,
        }
    }

    /// Key of `pk`, `pkh`, `wpkh` and `combo`.
    pub fn key_param(&self) -> Option<&KeyExpression> {
        match &self.node {
            ScriptNode::Pk(key)
            | ScriptNode::Pkh(key)
            | ScriptNode::Wpkh(key)
            | ScriptNode::Combo(key) => Some(key),
            _ => None,
        }
    }

    /// Threshold argument of `multi` and `sortedmulti`.
    pub fn n_sig_param(&self) -> Option<&NumberExpression> {
        match &self.node {
            ScriptNode::Multi { threshold, .. } | ScriptNode::SortedMulti { threshold, .. } => {
                Some(threshold)
            }
            _ => None,
        }
    }

    pub fn threshold(&self) -> Option<u32> {
        self.n_sig_param().map(NumberExpression::value)
    }

    /// Keys that are direct children of this expression.
    pub fn key_params(&self) -> &[KeyExpression] {
        match &self.node {
            ScriptNode::Pk(key)
            | ScriptNode::Pkh(key)
            | ScriptNode::Wpkh(key)
            | ScriptNode::Combo(key) => core::slice::from_ref(key),
            ScriptNode::Multi { keys, .. } | ScriptNode::SortedMulti { keys, .. } => keys,
            _ => &[],
        }
    }

    fn key_params_mut(&mut self) -> &mut [KeyExpression] {
        match &mut self.node {
            ScriptNode::Pk(key)
            | ScriptNode::Pkh(key)
            | ScriptNode::Wpkh(key)
            | ScriptNode::Combo(key) => core::slice::from_mut(key),
            ScriptNode::Multi { keys, .. } | ScriptNode::SortedMulti { keys, .. } => keys,
            _ => &mut [],
        }
    }

    pub fn addr_param(&self) -> Option<&AddrExpression> {
        match &self.node {
            ScriptNode::Addr(addr) => Some(addr),
            _ => None,
        }
    }

    pub fn hex_param(&self) -> Option<&HexExpression> {
        match &self.node {
            ScriptNode::Raw(hex) => Some(hex),
            _ => None,
        }
    }

    /// Whether any key of this expression, or of the script it wraps, has a wildcard.
    pub fn has_range_key(&self) -> bool {
        match self.script_param() {
            Some(inner) => inner.has_range_key(),
            None => self.key_params().iter().any(KeyExpression::from_range),
        }
    }

    /// Key range shared by every wildcard key, `None` without wildcard keys.
    ///
    /// Fails when two wildcard keys disagree on their range.
    pub fn key_range(&self) -> Result<Option<KeyRange>> {
        if let Some(inner) = self.script_param() {
            return inner.key_range();
        }

        let mut ranges = self
            .key_params()
            .iter()
            .filter_map(KeyExpression::key_range)
            .enumerate();

        let Some((_, first)) = ranges.next() else {
            return Ok(None);
        };
        for (idx, other) in ranges {
            if other != first {
                return Err(Error::KeyRangeMismatch {
                    first: first.to_string(),
                    index: idx + 1,
                    other: other.to_string(),
                });
            }
        }
        Ok(Some(first))
    }

    /// Sets the key range of every wildcard key, including those of a wrapped script.
    pub fn set_key_range(&mut self, range: KeyRange) -> Result<()> {
        if let ScriptNode::Sh(inner) | ScriptNode::Wsh(inner) = &mut self.node {
            return inner.set_key_range(range);
        }

        for key in self.key_params_mut().iter_mut().filter(|key| key.from_range()) {
            key.set_key_range(range)?;
        }
        Ok(())
    }

    /// Builder form of [`Self::set_key_range`].
    pub fn with_key_range(mut self, range: KeyRange) -> Result<Self> {
        self.set_key_range(range)?;
        Ok(self)
    }

    /// Scripts a `combo` expression stands for: `pk(K)`, `pkh(K)` and, when `K` is compressed,
    /// `wpkh(K)` and `sh(wpkh(K))`. Empty for every other script type.
    pub fn derived_scripts(&self) -> Result<Vec<ScriptExpression>> {
        let ScriptNode::Combo(key) = &self.node else {
            return Ok(Vec::new());
        };

        let network = self.network;
        let wrap = |script_type: ScriptType, text: String, child: Expression| {
            ScriptExpression::new(network, script_type, &text, vec![child], None)
        };

        let k = key.text();
        let mut scripts = vec![
            wrap(ScriptType::Pk, format!("pk({k})"), key.clone().into())?,
            wrap(ScriptType::Pkh, format!("pkh({k})"), key.clone().into())?,
        ];

        if key.is_compressed_pub_key() {
            let wpkh = wrap(ScriptType::Wpkh, format!("wpkh({k})"), key.clone().into())?;
            let sh_wpkh = wrap(ScriptType::Sh, format!("sh(wpkh({k}))"), wpkh.clone().into())?;
            scripts.push(wpkh);
            scripts.push(sh_wpkh);
        }
        Ok(scripts)
    }

    /// Payments this expression stands for, one per key-range index.
    pub fn payments(&self, ctx: &Context) -> Result<Vec<Payment>> {
        crate::script::payments(ctx, self)
    }

    /// Output scripts this expression stands for, one per key-range index.
    pub fn output_scripts(&self, ctx: &Context) -> Result<Vec<ScriptBuf>> {
        crate::script::output_scripts(ctx, self)
    }

    /// Addresses of the output scripts that have one.
    pub fn addresses(&self, ctx: &Context) -> Result<Vec<Address>> {
        crate::script::addresses(ctx, self)
    }
}

impl fmt::Display for ScriptExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
