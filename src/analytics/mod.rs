pub mod bs_analytic;
