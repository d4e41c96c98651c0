//! Master data extraction: company profile, chart of accounts, customers,
//! suppliers, products, and the tax table.

use rust_decimal::Decimal;

use super::{MasterDataSource, missing_field};
use crate::core::format::round_amount;
use crate::core::{
    Account, Address, Customer, Product, ProductType, SaftError, Supplier, TaxAccountingBasis,
    TaxTableEntry, TaxType,
};

/// CustomerTaxID stand-in for the anonymous final consumer.
pub const FINAL_CONSUMER_TAX_ID: &str = "999999999";

/// Raw company identity as stored by the host system.
#[derive(Debug, Clone, Default)]
pub struct CompanyRecord {
    pub tax_id: String,
    pub name: String,
    pub business_name: Option<String>,
    /// Commercial registry identifier; falls back to the tax ID.
    pub company_id: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub province: Option<String>,
    pub country: Option<String>,
    pub currency_code: Option<String>,
    pub tax_accounting_basis: Option<TaxAccountingBasis>,
    pub tax_entity: Option<String>,
}

/// Raw chart-of-accounts entry.
#[derive(Debug, Clone, Default)]
pub struct AccountRecord {
    pub account_id: String,
    pub description: Option<String>,
    pub opening_debit: Option<Decimal>,
    pub opening_credit: Option<Decimal>,
    pub closing_debit: Option<Decimal>,
    pub closing_credit: Option<Decimal>,
}

/// Raw customer record.
#[derive(Debug, Clone, Default)]
pub struct CustomerRecord {
    pub customer_id: String,
    pub account_id: Option<String>,
    pub tax_id: Option<String>,
    pub name: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub province: Option<String>,
    pub country: Option<String>,
    pub self_billing: Option<bool>,
}

/// Raw supplier record.
#[derive(Debug, Clone, Default)]
pub struct SupplierRecord {
    pub supplier_id: String,
    pub account_id: Option<String>,
    pub tax_id: Option<String>,
    pub name: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub province: Option<String>,
    pub country: Option<String>,
    pub self_billing: Option<bool>,
}

/// Raw product/service record.
#[derive(Debug, Clone, Default)]
pub struct ProductRecord {
    pub product_code: String,
    pub product_type: Option<ProductType>,
    pub description: Option<String>,
    pub product_group: Option<String>,
    /// Barcode where one exists; defaults to the internal code.
    pub number_code: Option<String>,
}

/// Raw tax-rate record.
#[derive(Debug, Clone, Default)]
pub struct TaxRateRecord {
    pub tax_code: String,
    pub tax_type: Option<TaxType>,
    pub description: Option<String>,
    pub country_region: Option<String>,
    pub percentage: Decimal,
}

/// Validated company identity carried into the header.
#[derive(Debug, Clone)]
pub struct CompanyProfile {
    pub company_id: String,
    pub tax_id: String,
    pub name: String,
    pub business_name: Option<String>,
    pub address: Address,
    pub currency_code: String,
    pub tax_accounting_basis: TaxAccountingBasis,
    pub tax_entity: String,
}

/// Validated master data for one run.
#[derive(Debug, Clone)]
pub struct MasterData {
    pub company: CompanyProfile,
    pub accounts: Vec<Account>,
    pub customers: Vec<Customer>,
    pub suppliers: Vec<Supplier>,
    pub products: Vec<Product>,
    pub tax_table: Vec<TaxTableEntry>,
}

/// Read and validate all master data from the source.
pub fn extract_master_data(src: &dyn MasterDataSource) -> Result<MasterData, SaftError> {
    let company = convert_company(src.company()?)?;

    let mut accounts = Vec::new();
    for (i, rec) in src.accounts()?.into_iter().enumerate() {
        accounts.push(convert_account(i, rec)?);
    }

    let mut customers = Vec::new();
    for (i, rec) in src.customers()?.into_iter().enumerate() {
        customers.push(convert_customer(i, rec)?);
    }

    let mut suppliers = Vec::new();
    for (i, rec) in src.suppliers()?.into_iter().enumerate() {
        suppliers.push(convert_supplier(i, rec)?);
    }

    let mut products = Vec::new();
    for (i, rec) in src.products()?.into_iter().enumerate() {
        products.push(convert_product(i, rec)?);
    }

    let mut tax_table = Vec::new();
    for (i, rec) in src.tax_table()?.into_iter().enumerate() {
        tax_table.push(convert_tax_rate(i, rec)?);
    }

    Ok(MasterData {
        company,
        accounts,
        customers,
        suppliers,
        products,
        tax_table,
    })
}

fn convert_company(rec: CompanyRecord) -> Result<CompanyProfile, SaftError> {
    if rec.tax_id.trim().is_empty() {
        return Err(missing_field("Company", "TaxRegistrationNumber"));
    }
    if rec.name.trim().is_empty() {
        return Err(missing_field("Company", "CompanyName"));
    }
    Ok(CompanyProfile {
        company_id: rec.company_id.unwrap_or_else(|| rec.tax_id.clone()),
        tax_id: rec.tax_id,
        name: rec.name,
        business_name: rec.business_name,
        address: Address {
            street_name: rec.street,
            city: rec.city.unwrap_or_default(),
            postal_code: rec.postal_code,
            province: rec.province,
            country: rec.country.unwrap_or_else(|| "AO".into()),
        },
        currency_code: rec.currency_code.unwrap_or_else(|| "AOA".into()),
        tax_accounting_basis: rec
            .tax_accounting_basis
            .unwrap_or(TaxAccountingBasis::Invoicing),
        tax_entity: rec.tax_entity.unwrap_or_else(|| "Global".into()),
    })
}

fn convert_account(index: usize, rec: AccountRecord) -> Result<Account, SaftError> {
    if rec.account_id.trim().is_empty() {
        return Err(missing_field(format!("Account[{index}]"), "AccountID"));
    }
    let description = match rec.description {
        Some(d) if !d.trim().is_empty() => d,
        _ => {
            return Err(missing_field(
                format!("Account \"{}\"", rec.account_id),
                "AccountDescription",
            ));
        }
    };
    Ok(Account {
        account_id: rec.account_id,
        account_description: description,
        opening_debit_balance: round_amount(rec.opening_debit.unwrap_or_default()),
        opening_credit_balance: round_amount(rec.opening_credit.unwrap_or_default()),
        closing_debit_balance: round_amount(rec.closing_debit.unwrap_or_default()),
        closing_credit_balance: round_amount(rec.closing_credit.unwrap_or_default()),
    })
}

fn convert_customer(index: usize, rec: CustomerRecord) -> Result<Customer, SaftError> {
    if rec.customer_id.trim().is_empty() {
        return Err(missing_field(format!("Customer[{index}]"), "CustomerID"));
    }
    let name = match rec.name {
        Some(n) if !n.trim().is_empty() => n,
        _ => {
            return Err(missing_field(
                format!("Customer \"{}\"", rec.customer_id),
                "CompanyName",
            ));
        }
    };
    Ok(Customer {
        customer_id: rec.customer_id,
        account_id: rec.account_id.unwrap_or_default(),
        tax_id: rec
            .tax_id
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| FINAL_CONSUMER_TAX_ID.into()),
        name,
        billing_address: billing_address(rec.street, rec.city, rec.postal_code, rec.province, rec.country),
        self_billing: rec.self_billing.unwrap_or(false),
    })
}

fn convert_supplier(index: usize, rec: SupplierRecord) -> Result<Supplier, SaftError> {
    if rec.supplier_id.trim().is_empty() {
        return Err(missing_field(format!("Supplier[{index}]"), "SupplierID"));
    }
    let name = match rec.name {
        Some(n) if !n.trim().is_empty() => n,
        _ => {
            return Err(missing_field(
                format!("Supplier \"{}\"", rec.supplier_id),
                "CompanyName",
            ));
        }
    };
    Ok(Supplier {
        supplier_id: rec.supplier_id,
        account_id: rec.account_id.unwrap_or_default(),
        tax_id: rec
            .tax_id
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| FINAL_CONSUMER_TAX_ID.into()),
        name,
        billing_address: billing_address(rec.street, rec.city, rec.postal_code, rec.province, rec.country),
        self_billing: rec.self_billing.unwrap_or(false),
    })
}

fn convert_product(index: usize, rec: ProductRecord) -> Result<Product, SaftError> {
    if rec.product_code.trim().is_empty() {
        return Err(missing_field(format!("Product[{index}]"), "ProductCode"));
    }
    let description = match rec.description {
        Some(d) if !d.trim().is_empty() => d,
        _ => {
            return Err(missing_field(
                format!("Product \"{}\"", rec.product_code),
                "ProductDescription",
            ));
        }
    };
    Ok(Product {
        product_type: rec.product_type.unwrap_or(ProductType::Goods),
        product_number_code: rec
            .number_code
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| rec.product_code.clone()),
        product_code: rec.product_code,
        product_group: rec.product_group,
        description,
    })
}

fn convert_tax_rate(index: usize, rec: TaxRateRecord) -> Result<TaxTableEntry, SaftError> {
    if rec.tax_code.trim().is_empty() {
        return Err(missing_field(format!("TaxTableEntry[{index}]"), "TaxCode"));
    }
    if rec.percentage < Decimal::ZERO {
        return Err(SaftError::DataIntegrity {
            record: format!("TaxTableEntry \"{}\"", rec.tax_code),
            message: format!("negative TaxPercentage {}", rec.percentage),
        });
    }
    Ok(TaxTableEntry {
        tax_type: rec.tax_type.unwrap_or(TaxType::Vat),
        tax_code: rec.tax_code,
        description: rec.description.unwrap_or_default(),
        country_region: rec.country_region.unwrap_or_else(|| "AO".into()),
        percentage: rec.percentage,
    })
}

fn billing_address(
    street: Option<String>,
    city: Option<String>,
    postal_code: Option<String>,
    province: Option<String>,
    country: Option<String>,
) -> Address {
    Address {
        street_name: street,
        city: city.unwrap_or_default(),
        postal_code,
        province,
        country: country.unwrap_or_else(|| "AO".into()),
    }
}
