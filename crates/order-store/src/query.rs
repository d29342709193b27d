use domain::CustomerId;

/// Default page size for order listings.
pub const DEFAULT_LIMIT: usize = 20;

/// Upper bound on the page size a caller may request.
pub const MAX_LIMIT: usize = 100;

/// Builder for order listing queries.
///
/// Results are always returned newest first. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderQuery {
    /// 1-based page number.
    pub page: usize,

    /// Maximum number of orders per page, capped at [`MAX_LIMIT`].
    pub limit: usize,

    /// Restrict to orders owned by this customer.
    pub customer_id: Option<CustomerId>,

    /// Restrict to orders still awaiting supplier fulfillment.
    pub awaiting_only: bool,
}

impl Default for OrderQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
            customer_id: None,
            awaiting_only: false,
        }
    }
}

impl OrderQuery {
    /// Creates a query for the first page with the default limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the 1-based page number (0 is treated as 1).
    pub fn page(mut self, page: usize) -> Self {
        self.page = page.max(1);
        self
    }

    /// Sets the page size, clamped to `1..=MAX_LIMIT`.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit.clamp(1, MAX_LIMIT);
        self
    }

    /// Restricts results to a single customer's orders.
    pub fn for_customer(mut self, customer_id: CustomerId) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    /// Restricts results to orders awaiting supplier fulfillment.
    ///
    /// This is the feed a resumption job works from.
    pub fn awaiting_only(mut self) -> Self {
        self.awaiting_only = true;
        self
    }

    /// Number of rows to skip for the requested page.
    pub fn offset(&self) -> usize {
        (self.page - 1) * self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_query_is_first_page() {
        let query = OrderQuery::new();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, DEFAULT_LIMIT);
        assert_eq!(query.offset(), 0);
        assert!(!query.awaiting_only);
    }

    #[test]
    fn offset_follows_page_and_limit() {
        let query = OrderQuery::new().page(3).limit(10);
        assert_eq!(query.offset(), 20);
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(OrderQuery::new().limit(0).limit, 1);
        assert_eq!(OrderQuery::new().limit(10_000).limit, MAX_LIMIT);
    }

    #[test]
    fn page_zero_is_treated_as_first() {
        assert_eq!(OrderQuery::new().page(0).page, 1);
    }

    #[test]
    fn builder_chain() {
        let query = OrderQuery::new()
            .page(2)
            .limit(5)
            .for_customer(CustomerId::new(7))
            .awaiting_only();

        assert_eq!(query.page, 2);
        assert_eq!(query.limit, 5);
        assert_eq!(query.customer_id, Some(CustomerId::new(7)));
        assert!(query.awaiting_only);
    }
}
