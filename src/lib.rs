pub mod config;
pub mod domain {
    pub mod charge;
}
pub mod error;
pub mod gateway;
pub mod http {
    pub mod handlers {
        pub mod charges;
        pub mod transactions;
        pub mod webhooks;
    }
}
pub mod ledger;
pub mod repo {
    pub mod transactions_repo;
}
pub mod service {
    pub mod dispatcher;
    pub mod reconciler;
}

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: service::dispatcher::ChargeDispatcher,
    pub reconciler: service::reconciler::WebhookReconciler,
    pub ledger: ledger::Ledger,
    pub transactions_repo: repo::transactions_repo::TransactionsRepo,
}
