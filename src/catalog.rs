//! Static variable catalog.
//!
//! The master catalog describes every variable the platform can fill in.
//! Each template category exposes its own ordered grouping of that catalog:
//! categories pick a subset and may file variables under different group
//! names. Both tables are plain data.

use serde::Serialize;

use crate::template::Category;
use crate::variables::VariableValues;

/// Fallback description for variables missing from the master catalog.
pub const UNKNOWN_VARIABLE_DESCRIPTION: &str =
    "Dynamic variable that will be replaced with actual data";

/// One entry of the master catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VariableInfo {
    pub name: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub example: &'static str,
}

/// Named group of variables offered for insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VariableGroup {
    pub name: &'static str,
    pub variables: &'static [&'static str],
}

const fn var(
    name: &'static str,
    label: &'static str,
    description: &'static str,
    example: &'static str,
) -> VariableInfo {
    VariableInfo {
        name,
        label,
        description,
        example,
    }
}

static MASTER_CATALOG: &[VariableInfo] = &[
    // Load
    var("LoadID", "Load ID", "Unique identifier for the load/shipment", "LD-12345"),
    var("LoadStatus", "Load Status", "Current status of the load (e.g., Dispatched, In Transit)", "Dispatched"),
    var("PreviousStatus", "Previous Status", "Previous status before current update", "Released"),
    var("LoadWeight", "Load Weight", "Total weight of the cargo in lbs", "42,000"),
    var("PickupLocation", "Pickup Location", "Address or location for cargo pickup", "Los Angeles, CA"),
    var("DeliveryLocation", "Delivery Location", "Final destination address for delivery", "Phoenix, AZ"),
    var("PickupDate", "Pickup Date", "Scheduled date for cargo pickup", "2024-03-04"),
    var("DeliveryDate", "Delivery Date", "Scheduled date for cargo delivery", "2024-03-05"),
    var("SpecialInstructions", "Special Instructions", "Additional handling or delivery instructions", "Driver must call 1h before arrival"),
    var("OrderNumber", "Order Number", "Customer's purchase order or reference number", "ORD-88721"),
    var("PONumber", "PO Number", "Purchase order number from customer", "PO-55012"),
    var("TotalBillable", "Total Billable", "Total amount billable to customer", "$2,850.00"),
    var("CarrierTotalPayable", "Carrier Total Payable", "Total amount payable to carrier", "$2,100.00"),
    // Carrier
    var("CarrierName", "Carrier Name", "Name of the transportation company", "ABC Trucking LLC"),
    var("CarrierEmail", "Carrier Email", "Primary email contact for carrier", "dispatch@abctrucking.com"),
    var("CarrierMC", "Carrier MC#", "Motor Carrier number (MC#) for carrier", "MC-123456"),
    var("AuthorityNumber", "Authority Number", "Operating authority number of the carrier", "DOT-3344556"),
    var("DriverName", "Driver Name", "Name of the assigned driver", "John Doe"),
    var("DriverEmails", "Driver Emails", "Driver's email address(es)", "john.doe@abctrucking.com"),
    // Customer and contacts
    var("Customer/Broker3PL", "Customer / Broker / 3PL", "Customer, broker, or 3PL company name", "Global Freight Partners"),
    var("ContactPerson", "Contact Person", "Primary contact person for this communication", "Mike Johnson"),
    var("ContactPhone", "Contact Phone", "Phone number recipients can call with questions", "(555) 123-4567"),
    var("SalesManager", "Sales Manager", "Assigned sales manager for this account", "Sarah Lee"),
    var("AccountManager", "Account Manager", "Dedicated account manager contact", "Tom Baker"),
    var("CustomerServiceRep", "Customer Service Rep", "Customer service representative assigned", "Ana Ortiz"),
    var("Dispatcher", "Dispatcher", "Dispatcher handling this load", "Chris Park"),
    var("CompanyName", "Company Name", "Name of the sending company", "Your Logistics Company"),
    // Financial
    var("InvoiceId", "Invoice ID", "Unique identifier for the invoice", "INV-2024-0042"),
    var("PaymentTerms", "Payment Terms", "Payment terms (e.g., Net 30, Quick Pay)", "Net 30"),
    var("InvoiceDueDate", "Invoice Due Date", "Date when payment is due", "2024-04-04"),
    var("Amount", "Amount", "Monetary amount of the transaction", "$1,250.00"),
    var("TransactionID", "Transaction ID", "Identifier of the payment transaction", "TXN-778899"),
    var("StatementPeriod", "Statement Period", "Period covered by a driver or carrier statement", "Week of March 1-7, 2024"),
    var("TotalEarnings", "Total Earnings", "Total earnings for the statement period", "$3,250.00"),
    // Marketplace
    var("BidAmount", "Bid Amount", "Amount offered in a load bid", "$2,100.00"),
    // System
    var("Timestamp", "Timestamp", "Time the notification was generated", "2024-03-04 09:30 UTC"),
];

static OPERATIONAL_GROUPS: &[VariableGroup] = &[
    VariableGroup {
        name: "Load",
        variables: &[
            "LoadID",
            "LoadStatus",
            "PreviousStatus",
            "PickupLocation",
            "PickupDate",
            "DeliveryLocation",
            "DeliveryDate",
            "LoadWeight",
            "SpecialInstructions",
            "OrderNumber",
            "PONumber",
        ],
    },
    VariableGroup {
        name: "Carrier",
        variables: &[
            "CarrierName",
            "CarrierEmail",
            "CarrierMC",
            "DriverName",
            "DriverEmails",
        ],
    },
    VariableGroup {
        name: "Contacts",
        variables: &[
            "Dispatcher",
            "CustomerServiceRep",
            "AccountManager",
            "SalesManager",
            "ContactPhone",
        ],
    },
    VariableGroup {
        name: "Customer",
        variables: &["Customer/Broker3PL", "CompanyName"],
    },
];

static FINANCIAL_GROUPS: &[VariableGroup] = &[
    VariableGroup {
        name: "Load Reference",
        variables: &["LoadID", "LoadStatus", "OrderNumber", "PONumber"],
    },
    VariableGroup {
        name: "Billing",
        variables: &[
            "InvoiceId",
            "PaymentTerms",
            "InvoiceDueDate",
            "TotalBillable",
            "CarrierTotalPayable",
            "Amount",
            "TransactionID",
        ],
    },
    VariableGroup {
        name: "Settlements",
        variables: &["DriverName", "StatementPeriod", "TotalEarnings"],
    },
    VariableGroup {
        name: "Parties",
        variables: &[
            "CarrierName",
            "CarrierEmail",
            "Customer/Broker3PL",
            "AccountManager",
            "CompanyName",
        ],
    },
];

static MARKETPLACE_GROUPS: &[VariableGroup] = &[
    VariableGroup {
        name: "Load",
        variables: &["LoadID", "PickupLocation", "DeliveryLocation", "PickupDate"],
    },
    VariableGroup {
        name: "Bid",
        variables: &["BidAmount", "CarrierName", "ContactPerson"],
    },
];

static ONBOARDING_GROUPS: &[VariableGroup] = &[
    VariableGroup {
        name: "Carrier",
        variables: &[
            "CarrierName",
            "CarrierEmail",
            "CarrierMC",
            "AuthorityNumber",
            "ContactPerson",
        ],
    },
    VariableGroup {
        name: "Company",
        variables: &["CompanyName", "AccountManager", "ContactPhone"],
    },
];

/// Every variable known to the platform, in catalog order.
pub fn master_catalog() -> &'static [VariableInfo] {
    MASTER_CATALOG
}

/// Ordered variable groups offered for a category.
pub fn catalog_for(category: Category) -> &'static [VariableGroup] {
    match category {
        Category::Operational => OPERATIONAL_GROUPS,
        Category::Financial => FINANCIAL_GROUPS,
        Category::Marketplace => MARKETPLACE_GROUPS,
        Category::Onboarding => ONBOARDING_GROUPS,
    }
}

/// Catalog entry for a variable name.
pub fn lookup(name: &str) -> Option<&'static VariableInfo> {
    MASTER_CATALOG.iter().find(|v| v.name == name)
}

/// Description shown next to a variable, with a generic fallback.
pub fn describe(name: &str) -> &'static str {
    lookup(name)
        .map(|v| v.description)
        .unwrap_or(UNKNOWN_VARIABLE_DESCRIPTION)
}

/// Whether `name` is offered for insertion in `category`.
pub fn is_available(category: Category, name: &str) -> bool {
    catalog_for(category)
        .iter()
        .any(|group| group.variables.contains(&name))
}

/// Example value of every catalog variable, keyed by name.
pub fn example_values() -> VariableValues {
    MASTER_CATALOG
        .iter()
        .map(|v| (v.name.to_string(), v.example.to_string()))
        .collect()
}
