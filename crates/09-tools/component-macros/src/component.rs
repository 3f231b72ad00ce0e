//! 组件派生宏实现

use crate::utils::{arc_inner_type, default_component_name, lit_str};
use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Error, Fields, Ident, LitStr, Result};

/// 组件作用域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScopeArg {
    #[default]
    Singleton,
    Prototype,
}

/// `#[component(...)]` 参数
#[derive(Debug, Default)]
pub struct ComponentArgs {
    /// 自定义组件名称
    pub name: Option<String>,
    pub scope: ScopeArg,
    pub lazy: bool,
    /// 注册标记名称
    pub markers: Vec<String>,
    /// 豁免的处理器名称
    pub skip_processors: Vec<String>,
    pub skip_all_processors: bool,
    /// post-construct 方法名
    pub post_construct: Option<Ident>,
    /// pre-destroy 方法名
    pub pre_destroy: Option<Ident>,
    pub registry_aware: bool,
    /// 需要的外部工厂
    pub factories: Vec<String>,
    pub listener: bool,
}

impl ComponentArgs {
    /// 从结构体属性中解析参数
    pub fn from_attributes(input: &DeriveInput) -> Result<Self> {
        let mut args = Self::default();

        for attr in input.attrs.iter().filter(|a| a.path().is_ident("component")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let value = lit_str(&meta)?;
                    if value.value().trim().is_empty() {
                        return Err(meta.error("组件名称不能为空"));
                    }
                    args.name = Some(value.value());
                } else if meta.path.is_ident("scope") {
                    let value = lit_str(&meta)?;
                    args.scope = match value.value().as_str() {
                        "singleton" => ScopeArg::Singleton,
                        "prototype" => ScopeArg::Prototype,
                        other => {
                            return Err(Error::new(
                                value.span(),
                                format!("未知作用域: {other}，可选 singleton / prototype"),
                            ))
                        }
                    };
                } else if meta.path.is_ident("prototype") {
                    args.scope = ScopeArg::Prototype;
                } else if meta.path.is_ident("lazy") {
                    args.lazy = true;
                } else if meta.path.is_ident("markers") {
                    meta.parse_nested_meta(|marker| {
                        let ident = marker
                            .path
                            .get_ident()
                            .ok_or_else(|| marker.error("标记必须是标识符"))?;
                        args.markers.push(ident.to_string());
                        Ok(())
                    })?;
                } else if meta.path.is_ident("skip_processors") {
                    let content;
                    syn::parenthesized!(content in meta.input);
                    let names = content.parse_terminated(
                        <LitStr as syn::parse::Parse>::parse,
                        syn::Token![,],
                    )?;
                    args.skip_processors
                        .extend(names.into_iter().map(|name| name.value()));
                } else if meta.path.is_ident("skip_all_processors") {
                    args.skip_all_processors = true;
                } else if meta.path.is_ident("post_construct") {
                    args.post_construct = Some(lit_str(&meta)?.parse()?);
                } else if meta.path.is_ident("pre_destroy") {
                    args.pre_destroy = Some(lit_str(&meta)?.parse()?);
                } else if meta.path.is_ident("registry_aware") {
                    args.registry_aware = true;
                } else if meta.path.is_ident("factory_aware") {
                    args.factories.push(lit_str(&meta)?.value());
                } else if meta.path.is_ident("listener") {
                    args.listener = true;
                } else {
                    return Err(meta.error("未知的 component 参数"));
                }
                Ok(())
            })?;
        }

        Ok(args)
    }
}

/// 注入字段
struct InjectedField {
    ident: Ident,
    target: TokenStream,
}

/// 结构体的构造方式
enum Construction {
    Unit,
    Named {
        injected: Vec<InjectedField>,
        defaulted: Vec<Ident>,
    },
}

fn parse_construction(input: &DeriveInput) -> Result<Construction> {
    let data = match &input.data {
        Data::Struct(data) => data,
        _ => {
            return Err(Error::new(
                input.ident.span(),
                "#[derive(Component)] 只支持结构体",
            ))
        }
    };

    let fields = match &data.fields {
        Fields::Unit => return Ok(Construction::Unit),
        Fields::Named(fields) => fields,
        Fields::Unnamed(fields) => {
            return Err(Error::new_spanned(fields, "#[derive(Component)] 不支持元组结构体"))
        }
    };

    let mut injected = Vec::new();
    let mut defaulted = Vec::new();
    for field in &fields.named {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| Error::new_spanned(field, "字段缺少名称"))?;
        let Some(attr) = field.attrs.iter().find(|a| a.path().is_ident("inject")) else {
            defaulted.push(ident);
            continue;
        };

        let inner = arc_inner_type(&field.ty)
            .ok_or_else(|| Error::new_spanned(&field.ty, "#[inject] 字段必须是 Arc<T>"))?;

        let mut qualifier: Option<LitStr> = None;
        if !matches!(attr.meta, syn::Meta::Path(_)) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    qualifier = Some(lit_str(&meta)?);
                    Ok(())
                } else {
                    Err(meta.error("未知的 inject 参数"))
                }
            })?;
        }

        let target = match qualifier {
            Some(name) => quote! { ::infrastructure_common::DependencyTarget::named(#name) },
            None => quote! { ::infrastructure_common::DependencyTarget::of::<#inner>() },
        };
        injected.push(InjectedField { ident, target });
    }

    Ok(Construction::Named {
        injected,
        defaulted,
    })
}

fn construction_tokens(construction: &Construction) -> TokenStream {
    match construction {
        Construction::Unit => quote! {
            .zero_arg(|| ::core::result::Result::Ok(Self))
        },
        // 没有注入字段时交给类型自己的 Default 实现
        Construction::Named { injected, .. } if injected.is_empty() => quote! {
            .default_constructor()
        },
        Construction::Named {
            injected,
            defaulted,
        } => {
            let points: Vec<String> = injected.iter().map(|f| f.ident.to_string()).collect();
            let targets = injected.iter().map(|f| &f.target);
            let idents = injected.iter().map(|f| &f.ident);
            quote! {
                .constructor(
                    ::std::vec![ #( (#points, #targets) ),* ],
                    |args: &mut ::infrastructure_common::Arguments| {
                        ::core::result::Result::Ok(Self {
                            #( #idents: args.take()?, )*
                            #( #defaulted: ::core::default::Default::default(), )*
                        })
                    },
                )
            }
        }
    }
}

/// 展开 `#[derive(Component)]`
pub fn expand(input: &DeriveInput) -> Result<TokenStream> {
    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "#[derive(Component)] 不支持泛型组件",
        ));
    }

    let args = ComponentArgs::from_attributes(input)?;
    let construction = parse_construction(input)?;
    let struct_name = &input.ident;
    let component_name = args
        .name
        .clone()
        .unwrap_or_else(|| default_component_name(&struct_name.to_string()));

    let construct = construction_tokens(&construction);
    let scope = match args.scope {
        ScopeArg::Singleton => quote! {},
        ScopeArg::Prototype => quote! { .prototype() },
    };
    let lazy = args.lazy.then(|| quote! { .lazy() });
    let markers = args.markers.iter().map(|marker| {
        quote! { .marker(::infrastructure_common::Marker::from_name(#marker)) }
    });
    let skips = args
        .skip_processors
        .iter()
        .map(|name| quote! { .skip_processor(#name) });
    let skip_all = args.skip_all_processors.then(|| quote! { .skip_all_processors() });
    let post_construct = args.post_construct.as_ref().map(|method| {
        quote! { .post_construct(|component: &mut Self| component.#method()) }
    });
    let pre_destroy = args.pre_destroy.as_ref().map(|method| {
        quote! { .pre_destroy(|component: &Self| component.#method()) }
    });
    let registry_aware = args.registry_aware.then(|| quote! { .registry_aware() });
    let factories = args
        .factories
        .iter()
        .map(|name| quote! { .factory_aware(#name) });
    let listener = args.listener.then(|| quote! { .listener() });

    let register_fn = format_ident!(
        "__register_component_{}",
        struct_name.to_string().to_lowercase(),
        span = Span::call_site()
    );

    Ok(quote! {
        impl ::infrastructure_common::Component for #struct_name {
            fn declaration() -> ::infrastructure_common::ComponentDeclaration {
                ::infrastructure_common::ComponentDeclaration::builder::<Self>(#component_name)
                    .module_path(::core::module_path!())
                    #construct
                    #scope
                    #lazy
                    #( #markers )*
                    #( #skips )*
                    #skip_all
                    #post_construct
                    #pre_destroy
                    #registry_aware
                    #( #factories )*
                    #listener
                    .build()
            }
        }

        // 程序启动时把声明提交到全局清单
        #[doc(hidden)]
        #[::ctor::ctor]
        fn #register_fn() {
            ::infrastructure_common::submit_declaration(::infrastructure_common::ManifestEntry {
                module_path: ::core::module_path!(),
                type_name: ::core::stringify!(#struct_name),
                declare: <#struct_name as ::infrastructure_common::Component>::declaration,
            });
        }
    })
}
