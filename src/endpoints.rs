//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/products/{product_id}', use [format_endpoint].

/// The route for listing and creating records in a reference category.
pub const REFERENCES: &str = "/api/reference/{category}";
/// The route for listing and creating products.
pub const PRODUCTS: &str = "/api/products";
/// The route to access a single product.
pub const PRODUCT: &str = "/api/products/{product_id}";
/// The route for listing the budgets of a product.
pub const PRODUCT_BUDGETS: &str = "/api/products/{product_id}/budgets";
/// The route for downloading the budgets of a product as CSV.
pub const EXPORT_BUDGETS: &str = "/api/products/{product_id}/budgets/export";
/// The route to upload a CSV file of budgets.
pub const UPLOAD_BUDGETS: &str = "/api/budgets/upload";
/// The route for listing recent uploads.
pub const UPLOADS: &str = "/api/uploads";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/api/products/{product_id}', '{product_id}' is the parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|end| param_start + end + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}

// These tests are here so that we know when we call `Uri::from_shared` it will not panic.
#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    use super::format_endpoint;

    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok());
    }

    #[test]
    fn endpoints_are_valid_uris() {
        assert_endpoint_is_valid_uri(endpoints::REFERENCES);
        assert_endpoint_is_valid_uri(endpoints::PRODUCTS);
        assert_endpoint_is_valid_uri(endpoints::PRODUCT);
        assert_endpoint_is_valid_uri(endpoints::PRODUCT_BUDGETS);
        assert_endpoint_is_valid_uri(endpoints::EXPORT_BUDGETS);
        assert_endpoint_is_valid_uri(endpoints::UPLOAD_BUDGETS);
        assert_endpoint_is_valid_uri(endpoints::UPLOADS);
    }

    #[test]
    fn replaces_parameter_with_id() {
        let formatted_path = format_endpoint(endpoints::PRODUCT_BUDGETS, 7);

        assert_eq!(formatted_path, "/api/products/7/budgets");
        assert!(formatted_path.parse::<Uri>().is_ok());
    }

    #[test]
    fn returns_original_path_with_no_parameter() {
        let formatted_path = format_endpoint(endpoints::PRODUCTS, 1);

        assert_eq!(formatted_path, "/api/products");
    }
}
