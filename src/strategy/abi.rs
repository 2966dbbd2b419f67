/// Solidity ABI codec for the call shapes the governance contracts use.
///
/// Values travel as `serde_json::Value`: addresses, integers, `bytes` and `bytesN` as
/// strings (integers decimal or `0x` hex on input, decimal on output), `bool` as a JSON
/// bool, tuples and arrays as JSON arrays. Types are described by [`AbiTypeSpec`],
/// usually parsed from a Solidity type string such as
/// `tuple(address to, uint256 value, bytes data)[]`.
use crate::domain::hex::{
    decode_hex_blob, encode_hex_blob, normalize_address, parse_u256_from_decimal_or_hex,
};
use alloy_primitives::{keccak256, I256, U256};
use serde_json::Value;

const WORD: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AbiTypeSpec {
    pub kind: String,
    pub components: Vec<AbiTypeSpec>,
}

impl AbiTypeSpec {
    pub fn primitive(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            components: Vec::new(),
        }
    }

    /// Parse a Solidity type string. Tuple component names are accepted and dropped.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err("abi type must be non-empty".to_string());
        }
        let tuple_body = trimmed
            .strip_prefix("tuple(")
            .or_else(|| trimmed.strip_prefix('('));
        let Some(body_and_suffix) = tuple_body else {
            return Ok(Self::primitive(&trimmed.to_ascii_lowercase()));
        };

        let close = matching_close_paren(body_and_suffix)
            .ok_or_else(|| format!("unbalanced parentheses in abi type {trimmed}"))?;
        let body = &body_and_suffix[..close];
        let suffix = body_and_suffix[close + 1..].trim();
        if !suffix.is_empty() && !is_array_suffix(suffix) {
            return Err(format!("invalid tuple suffix in abi type {trimmed}"));
        }
        let components = split_top_level(body)
            .into_iter()
            .filter(|component| !component.trim().is_empty())
            .map(|component| Self::parse(strip_component_name(component)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            kind: format!("tuple{suffix}"),
            components,
        })
    }

    /// Canonical form used in function signatures, e.g. `(address,bytes)[]`.
    pub fn canonical(&self) -> String {
        let kind = self.kind.trim();
        match kind.strip_prefix("tuple") {
            Some(suffix) => {
                let inner = self
                    .components
                    .iter()
                    .map(AbiTypeSpec::canonical)
                    .collect::<Vec<_>>()
                    .join(",");
                format!("({inner}){suffix}")
            }
            None => canonical_primitive(kind),
        }
    }
}

pub fn parse_types(raw: &[&str]) -> Result<Vec<AbiTypeSpec>, String> {
    raw.iter().map(|kind| AbiTypeSpec::parse(kind)).collect()
}

fn canonical_primitive(kind: &str) -> String {
    let (base, suffix) = match kind.find('[') {
        Some(index) => (&kind[..index], &kind[index..]),
        None => (kind, ""),
    };
    let base = match base {
        "uint" => "uint256",
        "int" => "int256",
        other => other,
    };
    format!("{base}{suffix}")
}

fn matching_close_paren(raw: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (index, ch) in raw.char_indices() {
        match ch {
            '(' => depth = depth.saturating_add(1),
            ')' if depth == 0 => return Some(index),
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}

fn split_top_level(raw: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (index, ch) in raw.char_indices() {
        match ch {
            '(' => depth = depth.saturating_add(1),
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&raw[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(&raw[start..]);
    parts
}

fn strip_component_name(raw: &str) -> &str {
    let trimmed = raw.trim();
    let last_close = trimmed.rfind(')').unwrap_or(0);
    match trimmed.rfind(char::is_whitespace) {
        Some(space) if space > last_close => trimmed[..space].trim_end(),
        _ => trimmed,
    }
}

fn is_array_suffix(raw: &str) -> bool {
    let mut rest = raw;
    while !rest.is_empty() {
        let Some(after_open) = rest.strip_prefix('[') else {
            return false;
        };
        let Some(close) = after_open.find(']') else {
            return false;
        };
        if !after_open[..close].bytes().all(|byte| byte.is_ascii_digit()) {
            return false;
        }
        rest = &after_open[close + 1..];
    }
    true
}

// ── Selectors ────────────────────────────────────────────────────────────────

/// `name(type1,type2,...)` with canonical type names.
pub fn canonical_signature(name: &str, inputs: &[AbiTypeSpec]) -> Result<String, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("function name must be non-empty".to_string());
    }
    let args = inputs
        .iter()
        .map(AbiTypeSpec::canonical)
        .collect::<Vec<_>>()
        .join(",");
    Ok(format!("{name}({args})"))
}

pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&hash[..4]);
    selector
}

pub fn function_selector_hex(signature: &str) -> String {
    encode_hex_blob(&function_selector(signature))
}

/// Selector followed by the ABI-encoded arguments.
pub fn encode_function_call(
    name: &str,
    inputs: &[AbiTypeSpec],
    values: &[Value],
) -> Result<Vec<u8>, String> {
    let signature = canonical_signature(name, inputs)?;
    let mut out = function_selector(&signature).to_vec();
    out.extend_from_slice(&encode_abi_params(inputs, values)?);
    Ok(out)
}

// ── Encoding ─────────────────────────────────────────────────────────────────

fn split_array_type(kind: &str) -> Option<(String, Option<usize>)> {
    if !kind.ends_with(']') {
        return None;
    }
    let start = kind.rfind('[')?;
    let base = kind[..start].to_string();
    let len_raw = &kind[start + 1..kind.len().saturating_sub(1)];
    if len_raw.is_empty() {
        return Some((base, None));
    }
    len_raw.parse::<usize>().ok().map(|len| (base, Some(len)))
}

fn element_spec(spec: &AbiTypeSpec, element_kind: String) -> AbiTypeSpec {
    AbiTypeSpec {
        kind: element_kind,
        components: spec.components.clone(),
    }
}

fn is_dynamic_type(spec: &AbiTypeSpec) -> bool {
    static_word_size(spec).is_none()
}

fn static_word_size(spec: &AbiTypeSpec) -> Option<usize> {
    if let Some((element_kind, maybe_len)) = split_array_type(spec.kind.trim()) {
        let array_len = maybe_len?;
        let element_words = static_word_size(&element_spec(spec, element_kind))?;
        return Some(element_words.saturating_mul(array_len));
    }

    let kind = spec.kind.trim().to_ascii_lowercase();
    if kind == "string" || kind == "bytes" {
        return None;
    }
    if kind == "tuple" {
        let mut words = 0usize;
        for component in &spec.components {
            words = words.saturating_add(static_word_size(component)?);
        }
        return Some(words);
    }
    Some(1)
}

/// Encode a slice of typed values according to the Solidity ABI head/tail layout.
///
/// Dynamic types contribute a 32-byte offset word to the head and append their
/// payload to the tail; static types are written directly into the head.
pub fn encode_abi_params(specs: &[AbiTypeSpec], values: &[Value]) -> Result<Vec<u8>, String> {
    if specs.len() != values.len() {
        return Err(format!(
            "abi encode arity mismatch: expected {} values, got {}",
            specs.len(),
            values.len()
        ));
    }

    let head_size_words = specs.iter().fold(0usize, |words, spec| {
        words.saturating_add(static_word_size(spec).unwrap_or(1))
    });
    let head_size_bytes = head_size_words.saturating_mul(WORD);
    let mut heads: Vec<Vec<u8>> = Vec::with_capacity(specs.len());
    let mut tails: Vec<Vec<u8>> = Vec::new();
    let mut tail_size_bytes = 0usize;

    for (index, (spec, value)) in specs.iter().zip(values.iter()).enumerate() {
        if is_dynamic_type(spec) {
            let tail = encode_abi_dynamic(spec, value, &format!("arg[{index}]"))?;
            let offset = head_size_bytes.saturating_add(tail_size_bytes);
            heads.push(encode_u256_word(U256::from(offset)));
            tail_size_bytes = tail_size_bytes.saturating_add(tail.len());
            tails.push(tail);
        } else {
            heads.push(encode_abi_static(spec, value, &format!("arg[{index}]"))?);
        }
    }

    let mut out = Vec::with_capacity(head_size_bytes.saturating_add(tail_size_bytes));
    for head in heads {
        out.extend_from_slice(&head);
    }
    for tail in tails {
        out.extend_from_slice(&tail);
    }
    Ok(out)
}

fn parse_sequence<'a>(value: &'a Value, field: &str) -> Result<&'a [Value], String> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| format!("{field} must be a JSON array"))
}

fn encode_abi_static(spec: &AbiTypeSpec, value: &Value, field: &str) -> Result<Vec<u8>, String> {
    if let Some((element_kind, Some(array_len))) = split_array_type(spec.kind.trim()) {
        let values = parse_sequence(value, field)?;
        if values.len() != array_len {
            return Err(format!(
                "{field} length mismatch: expected {array_len} got {}",
                values.len()
            ));
        }
        let element = element_spec(spec, element_kind);
        let mut out = Vec::new();
        for (idx, item) in values.iter().enumerate() {
            out.extend_from_slice(&encode_abi_static(
                &element,
                item,
                &format!("{field}[{idx}]"),
            )?);
        }
        return Ok(out);
    }

    let kind = spec.kind.trim().to_ascii_lowercase();
    if kind == "tuple" {
        let values = parse_sequence(value, field)?;
        if values.len() != spec.components.len() {
            return Err(format!(
                "{field} tuple arity mismatch: expected {} got {}",
                spec.components.len(),
                values.len()
            ));
        }
        let mut out = Vec::new();
        for (idx, (component, component_value)) in
            spec.components.iter().zip(values.iter()).enumerate()
        {
            out.extend_from_slice(&encode_abi_static(
                component,
                component_value,
                &format!("{field}.{idx}"),
            )?);
        }
        return Ok(out);
    }

    encode_abi_primitive_word(&kind, value, field)
}

fn encode_abi_dynamic(spec: &AbiTypeSpec, value: &Value, field: &str) -> Result<Vec<u8>, String> {
    if let Some((element_kind, maybe_len)) = split_array_type(spec.kind.trim()) {
        let values = parse_sequence(value, field)?;
        if let Some(expected_len) = maybe_len {
            if values.len() != expected_len {
                return Err(format!(
                    "{field} length mismatch: expected {expected_len} got {}",
                    values.len()
                ));
            }
        }
        let repeated_specs = vec![element_spec(spec, element_kind); values.len()];
        let encoded_elements = encode_abi_params(&repeated_specs, values)?;
        let mut out = Vec::new();
        if maybe_len.is_none() {
            out.extend_from_slice(&encode_u256_word(U256::from(values.len())));
        }
        out.extend_from_slice(&encoded_elements);
        return Ok(out);
    }

    let kind = spec.kind.trim().to_ascii_lowercase();
    match kind.as_str() {
        "tuple" => encode_abi_params(&spec.components, parse_sequence(value, field)?),
        "bytes" => {
            let raw = value
                .as_str()
                .ok_or_else(|| format!("{field} must be a 0x-prefixed hex string"))?;
            encode_dynamic_bytes(&decode_hex_blob(raw, field)?)
        }
        "string" => {
            let text = value
                .as_str()
                .ok_or_else(|| format!("{field} must be a string"))?;
            encode_dynamic_bytes(text.as_bytes())
        }
        _ => Err(format!("unsupported dynamic abi type: {kind}")),
    }
}

/// Length word followed by the payload zero-padded to the next word boundary.
fn encode_dynamic_bytes(bytes: &[u8]) -> Result<Vec<u8>, String> {
    let mut out = Vec::with_capacity(WORD + padded_len(bytes.len()));
    out.extend_from_slice(&encode_u256_word(U256::from(bytes.len())));
    out.extend_from_slice(bytes);
    out.resize(WORD + padded_len(bytes.len()), 0);
    Ok(out)
}

fn padded_len(len: usize) -> usize {
    len.div_ceil(WORD).saturating_mul(WORD)
}

fn integer_width(kind: &str, prefix: &str) -> Result<usize, String> {
    let raw = kind.trim_start_matches(prefix);
    if raw.is_empty() {
        return Ok(256);
    }
    let bits = raw
        .parse::<usize>()
        .map_err(|_error| format!("unsupported abi type: {kind}"))?;
    if bits == 0 || bits > 256 || bits % 8 != 0 {
        return Err(format!("unsupported integer width in abi type: {kind}"));
    }
    Ok(bits)
}

fn encode_abi_primitive_word(kind: &str, value: &Value, field: &str) -> Result<Vec<u8>, String> {
    match kind {
        "address" => {
            let raw = value
                .as_str()
                .ok_or_else(|| format!("{field} address must be a string"))?;
            let bytes = decode_hex_blob(&normalize_address(raw)?, field)?;
            let mut word = vec![0u8; WORD];
            word[12..].copy_from_slice(&bytes);
            Ok(word)
        }
        "bool" => {
            let raw = value
                .as_bool()
                .ok_or_else(|| format!("{field} bool must be true/false"))?;
            Ok(encode_u256_word(U256::from(u8::from(raw))))
        }
        _ if kind.starts_with("uint") => {
            let bits = integer_width(kind, "uint")?;
            let parsed = parse_u256_from_json(value, field)?;
            if parsed.bit_len() > bits {
                return Err(format!("{field} does not fit in {kind}"));
            }
            Ok(encode_u256_word(parsed))
        }
        _ if kind.starts_with("int") => {
            integer_width(kind, "int")?;
            let parsed = parse_i128_from_json(value, field)?;
            if parsed < 0 {
                return Err(format!(
                    "{field} negative signed integers are not supported"
                ));
            }
            Ok(encode_u256_word(U256::from(parsed as u128)))
        }
        _ if kind.starts_with("bytes") => {
            let width = kind
                .trim_start_matches("bytes")
                .parse::<usize>()
                .map_err(|_error| format!("unsupported abi type: {kind}"))?;
            if !(1..=WORD).contains(&width) {
                return Err(format!("fixed bytes width must be in 1..=32, got {width}"));
            }
            let raw = value
                .as_str()
                .ok_or_else(|| format!("{field} fixed bytes must be a hex string"))?;
            let bytes = decode_hex_blob(raw, field)?;
            if bytes.len() > width {
                return Err(format!(
                    "{field} length exceeds bytes{width}: {} bytes",
                    bytes.len()
                ));
            }
            let mut word = vec![0u8; WORD];
            word[..bytes.len()].copy_from_slice(&bytes);
            Ok(word)
        }
        _ => Err(format!("unsupported abi primitive type: {kind}")),
    }
}

fn parse_u256_from_json(value: &Value, field: &str) -> Result<U256, String> {
    if let Some(raw) = value.as_str() {
        return parse_u256_from_decimal_or_hex(raw, field);
    }
    if let Some(raw) = value.as_u64() {
        return Ok(U256::from(raw));
    }
    Err(format!("{field} must be a string or unsigned integer"))
}

fn parse_i128_from_json(value: &Value, field: &str) -> Result<i128, String> {
    if let Some(raw) = value.as_i64() {
        return Ok(i128::from(raw));
    }
    let raw = value
        .as_str()
        .ok_or_else(|| format!("{field} must be a string or integer"))?;
    raw.parse::<i128>()
        .map_err(|error| format!("failed to parse {field} as signed integer: {error}"))
}

pub fn encode_u256_word(value: U256) -> Vec<u8> {
    value.to_be_bytes::<32>().to_vec()
}

// ── Decoding ─────────────────────────────────────────────────────────────────

/// Inverse of [`encode_abi_params`]; offsets are relative to the start of `data`.
pub fn decode_abi_params(specs: &[AbiTypeSpec], data: &[u8]) -> Result<Vec<Value>, String> {
    let mut values = Vec::with_capacity(specs.len());
    let mut cursor = 0usize;
    for (index, spec) in specs.iter().enumerate() {
        let field = format!("arg[{index}]");
        if is_dynamic_type(spec) {
            let offset = read_usize_word(data, cursor, &field)?;
            let tail = data
                .get(offset..)
                .ok_or_else(|| format!("{field} offset {offset} is out of bounds"))?;
            values.push(decode_abi_dynamic(spec, tail, &field)?);
            cursor = cursor.saturating_add(WORD);
        } else {
            let words = static_word_size(spec).unwrap_or(1);
            values.push(decode_abi_static(spec, data, cursor, &field)?);
            cursor = cursor.saturating_add(words.saturating_mul(WORD));
        }
    }
    Ok(values)
}

fn decode_abi_dynamic(spec: &AbiTypeSpec, data: &[u8], field: &str) -> Result<Value, String> {
    if let Some((element_kind, maybe_len)) = split_array_type(spec.kind.trim()) {
        let (len, body) = match maybe_len {
            Some(len) => (len, data),
            None => {
                let len = read_usize_word(data, 0, field)?;
                (len, data.get(WORD..).unwrap_or_default())
            }
        };
        let repeated_specs = vec![element_spec(spec, element_kind); len];
        return decode_abi_params(&repeated_specs, body).map(Value::Array);
    }

    let kind = spec.kind.trim().to_ascii_lowercase();
    match kind.as_str() {
        "tuple" => decode_abi_params(&spec.components, data).map(Value::Array),
        "bytes" => Ok(Value::String(encode_hex_blob(read_dynamic_bytes(
            data, field,
        )?))),
        "string" => {
            let bytes = read_dynamic_bytes(data, field)?;
            String::from_utf8(bytes.to_vec())
                .map(Value::String)
                .map_err(|error| format!("{field} is not valid utf-8: {error}"))
        }
        _ => Err(format!("unsupported dynamic abi type: {kind}")),
    }
}

fn decode_abi_static(
    spec: &AbiTypeSpec,
    data: &[u8],
    position: usize,
    field: &str,
) -> Result<Value, String> {
    if let Some((element_kind, Some(array_len))) = split_array_type(spec.kind.trim()) {
        let element = element_spec(spec, element_kind);
        let stride = static_word_size(&element).unwrap_or(1).saturating_mul(WORD);
        let mut items = Vec::with_capacity(array_len);
        for idx in 0..array_len {
            items.push(decode_abi_static(
                &element,
                data,
                position.saturating_add(stride.saturating_mul(idx)),
                &format!("{field}[{idx}]"),
            )?);
        }
        return Ok(Value::Array(items));
    }

    let kind = spec.kind.trim().to_ascii_lowercase();
    if kind == "tuple" {
        let mut items = Vec::with_capacity(spec.components.len());
        let mut cursor = position;
        for (idx, component) in spec.components.iter().enumerate() {
            items.push(decode_abi_static(
                component,
                data,
                cursor,
                &format!("{field}.{idx}"),
            )?);
            cursor = cursor
                .saturating_add(static_word_size(component).unwrap_or(1).saturating_mul(WORD));
        }
        return Ok(Value::Array(items));
    }

    let word = read_word(data, position, field)?;
    decode_abi_primitive_word(&kind, word, field)
}

fn decode_abi_primitive_word(kind: &str, word: &[u8], field: &str) -> Result<Value, String> {
    match kind {
        "address" => Ok(Value::String(encode_hex_blob(&word[12..]))),
        "bool" => match U256::from_be_slice(word) {
            value if value == U256::ZERO => Ok(Value::Bool(false)),
            value if value == U256::from(1u8) => Ok(Value::Bool(true)),
            _ => Err(format!("{field} is not a valid bool word")),
        },
        _ if kind.starts_with("uint") => {
            let bits = integer_width(kind, "uint")?;
            let value = U256::from_be_slice(word);
            if value.bit_len() > bits {
                return Err(format!("{field} overflows {kind}"));
            }
            Ok(Value::String(value.to_string()))
        }
        _ if kind.starts_with("int") => {
            integer_width(kind, "int")?;
            Ok(Value::String(
                I256::from_raw(U256::from_be_slice(word)).to_string(),
            ))
        }
        _ if kind.starts_with("bytes") => {
            let width = kind
                .trim_start_matches("bytes")
                .parse::<usize>()
                .map_err(|_error| format!("unsupported abi type: {kind}"))?;
            if !(1..=WORD).contains(&width) {
                return Err(format!("fixed bytes width must be in 1..=32, got {width}"));
            }
            Ok(Value::String(encode_hex_blob(&word[..width])))
        }
        _ => Err(format!("unsupported abi primitive type: {kind}")),
    }
}

fn read_word<'a>(data: &'a [u8], position: usize, field: &str) -> Result<&'a [u8], String> {
    data.get(position..position.saturating_add(WORD))
        .filter(|word| word.len() == WORD)
        .ok_or_else(|| format!("{field} word at {position} is out of bounds"))
}

fn read_usize_word(data: &[u8], position: usize, field: &str) -> Result<usize, String> {
    let value = U256::from_be_slice(read_word(data, position, field)?);
    usize::try_from(value).map_err(|_error| format!("{field} offset or length is too large"))
}

fn read_dynamic_bytes<'a>(data: &'a [u8], field: &str) -> Result<&'a [u8], String> {
    let len = read_usize_word(data, 0, field)?;
    data.get(WORD..WORD.saturating_add(len))
        .filter(|bytes| bytes.len() == len)
        .ok_or_else(|| format!("{field} byte payload is truncated"))
}
