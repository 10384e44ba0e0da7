//! DistinguishedName 与 X.509 `Name` 之间的转换

use clavis_key::DistinguishedName;
use const_oid::ObjectIdentifier;
use der::{
    asn1::{PrintableStringRef, SetOfVec},
    Any, Tag, Tagged,
};
use x509_cert::{
    attr::AttributeTypeAndValue,
    name::{Name, RdnSequence, RelativeDistinguishedName},
};

use crate::error::{PkiError, Result};

pub const COUNTRY_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");
pub const STATE_OR_PROVINCE_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.8");
pub const LOCALITY_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.7");
pub const ORGANIZATION_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.10");
pub const ORGANIZATIONAL_UNIT_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.11");
pub const COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");

/// 构建 X.509 Name，顺序为 C, ST, L, O, OU, CN
pub fn to_x509_name(dn: &DistinguishedName) -> Result<Name> {
    let attributes = [
        (COUNTRY_NAME, dn.country_code()),
        (STATE_OR_PROVINCE_NAME, dn.state()),
        (LOCALITY_NAME, dn.city()),
        (ORGANIZATION_NAME, dn.company()),
        (ORGANIZATIONAL_UNIT_NAME, dn.division()),
        (COMMON_NAME, dn.name()),
    ];

    let mut rdns = Vec::with_capacity(attributes.len());
    for (oid, value) in attributes {
        let mut set = SetOfVec::new();
        set.insert(AttributeTypeAndValue {
            oid,
            value: encode_value(oid, value)?,
        })
        .map_err(|e| PkiError::signing(format!("Failed to add {oid} to name"), e))?;
        rdns.push(RelativeDistinguishedName(set));
    }

    Ok(RdnSequence(rdns))
}

// 国家代码按惯例使用 PrintableString，无法表示时退回 UTF8String
fn encode_value(oid: ObjectIdentifier, value: &str) -> Result<Any> {
    let tag = if oid == COUNTRY_NAME && PrintableStringRef::new(value).is_ok() {
        Tag::PrintableString
    } else {
        Tag::Utf8String
    };
    Any::new(tag, value.as_bytes())
        .map_err(|e| PkiError::signing(format!("Invalid value for {oid}"), e))
}

/// 解析 X.509 Name；缺失字段为 "Unknown"，缺少 CN 视为解析错误
pub fn from_x509_name(name: &Name) -> Result<DistinguishedName> {
    let mut common_name = None;
    let mut country_code = None;
    let mut state = None;
    let mut city = None;
    let mut company = None;
    let mut division = None;

    for rdn in name.0.iter() {
        for attr in rdn.0.iter() {
            let slot = if attr.oid == COMMON_NAME {
                &mut common_name
            } else if attr.oid == COUNTRY_NAME {
                &mut country_code
            } else if attr.oid == STATE_OR_PROVINCE_NAME {
                &mut state
            } else if attr.oid == LOCALITY_NAME {
                &mut city
            } else if attr.oid == ORGANIZATION_NAME {
                &mut company
            } else if attr.oid == ORGANIZATIONAL_UNIT_NAME {
                &mut division
            } else {
                continue;
            };
            // 同一属性出现多次时保留第一个
            if slot.is_none() {
                *slot = Some(decode_value(&attr.value)?);
            }
        }
    }

    let common_name = common_name
        .ok_or_else(|| PkiError::certificate_decode_msg("Name has no common name (CN)"))?;
    let mut dn = DistinguishedName::new(common_name);
    if let Some(value) = country_code {
        dn.set_country_code(value);
    }
    if let Some(value) = state {
        dn.set_state(value);
    }
    if let Some(value) = city {
        dn.set_city(value);
    }
    if let Some(value) = company {
        dn.set_company(value);
    }
    if let Some(value) = division {
        dn.set_division(value);
    }
    Ok(dn)
}

// TeletexString (T.61) 不是 UTF-8，不接受
fn decode_value(value: &Any) -> Result<String> {
    match value.tag() {
        Tag::Utf8String | Tag::PrintableString | Tag::Ia5String => {
            std::str::from_utf8(value.value())
                .map(str::to_string)
                .map_err(|e| PkiError::certificate_decode("Name attribute is not valid text", e))
        }
        other => Err(PkiError::certificate_decode_msg(format!(
            "Unsupported name attribute encoding {other}"
        ))),
    }
}
