//! 宏工具函数

use syn::meta::ParseNestedMeta;
use syn::{GenericArgument, LitStr, PathArguments, Result, Type};

/// 根据类型名生成默认组件名称（首字母小写）
pub fn default_component_name(type_name: &str) -> String {
    let mut chars = type_name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// 解析 `key = "value"` 形式的字符串参数
pub fn lit_str(meta: &ParseNestedMeta<'_>) -> Result<LitStr> {
    meta.value()?.parse()
}

/// 提取 `Arc<T>` 中的 `T`
pub fn arc_inner_type(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Arc" {
        return None;
    }
    match &segment.arguments {
        PathArguments::AngleBracketed(args) => match args.args.first() {
            Some(GenericArgument::Type(inner)) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}
