//! Request template expansion
//!
//! Produces a resolved deep copy of a stored request. The stored request is
//! only borrowed, so expansion can never leak into it.

use indexmap::IndexMap;

use crate::models::{
    AuthConfig, Collection, Environment, GraphQlRequest, Request, RequestCommon, RestRequest,
    WebSocketRequest,
};
use crate::variables::ResolveContext;

/// Clone `request` and resolve every templated field against the given scopes
pub fn resolve_request(
    request: &Request,
    environment: &Environment,
    collection: Option<&Collection>,
) -> Request {
    let ctx = ResolveContext::new(environment, collection).with_request(request.common());

    match request {
        Request::Rest(rest) => Request::Rest(resolve_rest(rest, &ctx)),
        Request::GraphQl(gql) => Request::GraphQl(resolve_graphql(gql, &ctx)),
        Request::WebSocket(ws) => Request::WebSocket(resolve_websocket(ws, &ctx)),
    }
}

fn resolve_common(common: &RequestCommon, ctx: &ResolveContext<'_>) -> RequestCommon {
    RequestCommon {
        url: ctx.resolve(&common.url),
        headers: resolve_map(&common.headers, ctx),
        auth: resolve_auth(&common.auth, ctx),
        ..common.clone()
    }
}

fn resolve_map(
    map: &IndexMap<String, String>,
    ctx: &ResolveContext<'_>,
) -> IndexMap<String, String> {
    map.iter()
        .map(|(k, v)| (ctx.resolve(k), ctx.resolve(v)))
        .collect()
}

fn resolve_auth(auth: &AuthConfig, ctx: &ResolveContext<'_>) -> AuthConfig {
    match auth {
        AuthConfig::None => AuthConfig::None,
        AuthConfig::Basic { username, password } => AuthConfig::Basic {
            username: ctx.resolve(username),
            password: ctx.resolve(password),
        },
        AuthConfig::BearerToken { token } => AuthConfig::BearerToken {
            token: ctx.resolve(token),
        },
    }
}

fn resolve_rest(rest: &RestRequest, ctx: &ResolveContext<'_>) -> RestRequest {
    let mut resolved = rest.clone();
    resolved.common = resolve_common(&rest.common, ctx);
    resolved.body = rest.body.as_deref().map(|b| ctx.resolve(b));
    resolved.query_params = resolve_map(&rest.query_params, ctx);
    for field in &mut resolved.form_fields {
        field.key = ctx.resolve(&field.key);
        field.value = ctx.resolve(&field.value);
    }
    for file in &mut resolved.form_files {
        file.key = ctx.resolve(&file.key);
        file.path = ctx.resolve(&file.path);
    }
    resolved
}

fn resolve_graphql(gql: &GraphQlRequest, ctx: &ResolveContext<'_>) -> GraphQlRequest {
    GraphQlRequest {
        common: resolve_common(&gql.common, ctx),
        query: ctx.resolve(&gql.query),
        variables: gql.variables.as_deref().map(|v| ctx.resolve(v)),
        operation_name: gql.operation_name.as_deref().map(|n| ctx.resolve(n)),
        ..gql.clone()
    }
}

fn resolve_websocket(ws: &WebSocketRequest, ctx: &ResolveContext<'_>) -> WebSocketRequest {
    WebSocketRequest {
        common: resolve_common(&ws.common, ctx),
        message: ws.message.as_deref().map(|m| ctx.resolve(m)),
        protocols: ws.protocols.iter().map(|p| ctx.resolve(p)).collect(),
        ..ws.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FormField, HttpMethod};

    fn env() -> Environment {
        Environment::new("dev", "Dev")
            .with_variable("host", "api.test")
            .with_variable("token", "abc")
            .with_variable("hdr", "X-Trace")
            .with_variable("user", "alice")
    }

    fn rest() -> RestRequest {
        let mut r = RestRequest {
            common: RequestCommon::new("r1", "Get user", "https://{{host}}/users/{{user}}"),
            method: HttpMethod::Post,
            body: Some(r#"{"name":"{{user}}"}"#.to_string()),
            ..Default::default()
        };
        r.common.headers.insert("{{hdr}}".into(), "{{token}}".into());
        r.common.auth = AuthConfig::BearerToken { token: "{{token}}".into() };
        r.query_params.insert("q".into(), "{{user}}".into());
        r.form_fields.push(FormField {
            key: "who".into(),
            value: "{{user}}".into(),
            enabled: true,
        });
        r
    }

    #[test]
    fn test_rest_fields_resolved() {
        let original: Request = rest().into();
        let resolved = resolve_request(&original, &env(), None);
        let Request::Rest(r) = resolved else { panic!("variant changed") };

        assert_eq!(r.common.url, "https://api.test/users/alice");
        assert_eq!(r.common.headers.get("X-Trace").map(String::as_str), Some("abc"));
        assert_eq!(r.common.auth, AuthConfig::BearerToken { token: "abc".into() });
        assert_eq!(r.body.as_deref(), Some(r#"{"name":"alice"}"#));
        assert_eq!(r.query_params.get("q").map(String::as_str), Some("alice"));
        assert_eq!(r.form_fields[0].value, "alice");
        assert_eq!(r.method, HttpMethod::Post);
    }

    #[test]
    fn test_clone_isolation() {
        let original: Request = rest().into();
        let mut resolved = resolve_request(&original, &env(), None);
        resolved.common_mut().headers.insert("Injected".into(), "1".into());
        resolved.common_mut().headers.clear();

        assert_eq!(original.common().headers.len(), 1);
        assert_eq!(original.common().headers.get("{{hdr}}").map(String::as_str), Some("{{token}}"));
        assert_eq!(original.common().url, "https://{{host}}/users/{{user}}");
    }

    #[test]
    fn test_graphql_fields_resolved() {
        let gql = GraphQlRequest {
            common: RequestCommon::new("g", "Q", "https://{{host}}/graphql"),
            query: "query { user(name: \"{{user}}\") { id } }".into(),
            variables: Some(r#"{"token":"{{token}}"}"#.into()),
            operation_name: Some("{{missing}}".into()),
            ..Default::default()
        };
        let Request::GraphQl(r) = resolve_request(&gql.into(), &env(), None) else {
            panic!("variant changed")
        };
        assert_eq!(r.common.url, "https://api.test/graphql");
        assert!(r.query.contains("\"alice\""));
        assert_eq!(r.variables.as_deref(), Some(r#"{"token":"abc"}"#));
        assert_eq!(r.operation_name.as_deref(), Some("{{missing}}"));
    }

    #[test]
    fn test_websocket_fields_resolved() {
        let ws = WebSocketRequest {
            common: RequestCommon::new("w", "WS", "wss://{{host}}/ws"),
            message: Some("hello {{user}}".into()),
            protocols: vec!["{{user}}-proto".into()],
            ..Default::default()
        };
        let Request::WebSocket(r) = resolve_request(&ws.into(), &env(), None) else {
            panic!("variant changed")
        };
        assert_eq!(r.common.url, "wss://api.test/ws");
        assert_eq!(r.message.as_deref(), Some("hello alice"));
        assert_eq!(r.protocols, vec!["alice-proto"]);
    }

    #[test]
    fn test_basic_auth_resolved_with_collection() {
        let mut r = rest();
        r.common.auth = AuthConfig::Basic {
            username: "{{user}}".into(),
            password: "{{pw}}".into(),
        };
        let col = Collection::new("c", "C")
            .with_variable("pw", "hunter2")
            .with_variable("user", "bob");
        let Request::Rest(resolved) = resolve_request(&r.into(), &env(), Some(&col)) else {
            panic!("variant changed")
        };
        assert_eq!(
            resolved.common.auth,
            AuthConfig::Basic { username: "bob".into(), password: "hunter2".into() }
        );
    }
}
